//! Core types for the order service.
//!
//! The `Order` aggregate mirrors the JSON shape published to the broker.

pub mod order;
pub mod uid;

pub use order::{Delivery, Item, Order, Payment};
pub use uid::OrderUid;
