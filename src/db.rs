pub mod alert_repository;
pub mod booking_repository;
pub mod error;
pub mod models;

pub use alert_repository::AlertRepository;
pub use booking_repository::BookingRepository;
pub use error::DbError;
pub use models::*;
