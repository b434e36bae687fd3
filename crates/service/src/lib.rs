//! Order service library.
//!
//! Ingests orders from a message broker, persists each one transactionally
//! to `PostgreSQL`, and keeps a write-through in-memory cache that serves
//! all reads.
//!
//! # Architecture
//!
//! - [`broker`]: message source and the decode/validate/ingest pipeline
//! - [`services::OrderService`]: persist-then-cache orchestration and
//!   startup rehydration
//! - [`db`]: store capability traits and the `PostgreSQL` adapter
//! - [`cache::OrderCache`]: concurrent uid-keyed order table
//! - [`routes`]: cache-only HTTP lookup

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod broker;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
