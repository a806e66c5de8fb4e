//! Entity definitions (database row mappings).

pub mod driver;
pub mod payment;
pub mod ride;
pub mod trip;

pub use driver::DriverEntity;
pub use payment::PaymentEntity;
pub use ride::RideEntity;
pub use trip::TripEntity;
