//! Business logic services.

pub mod orders;

pub use orders::{OrderService, OrderServiceError};
