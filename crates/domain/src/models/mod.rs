//! Domain models.

pub mod driver;
pub mod payment;
pub mod ride;
pub mod trip;

pub use driver::{Driver, DriverStatus, ServiceTier};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use ride::{Ride, RideStatus};
pub use trip::{Trip, TripStatus};
