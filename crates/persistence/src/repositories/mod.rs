//! Repository implementations.

pub mod driver;
pub mod payment;
pub mod ride;
pub mod trip;

pub use driver::DriverRepository;
pub use payment::PaymentRepository;
pub use ride::{CreateRideInput, RideRepository};
pub use trip::TripRepository;
