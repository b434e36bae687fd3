//! Order Service Core - Domain types and validation.
//!
//! This crate provides the types shared by every order-service component:
//! - `service` - Ingestion pipeline, write-through cache, and read endpoint
//! - `cli` - Migrations and administrative store access
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no broker clients. Enable the `postgres` feature to get
//! `sqlx` encoding for [`OrderUid`].
//!
//! # Modules
//!
//! - [`types`] - The `Order` aggregate and its embedded records
//! - [`validation`] - Schema-level checks applied before persistence

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{Rule, ValidationError, validate, validate_uid};
