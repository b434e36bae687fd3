//! Message broker ingestion.
//!
//! # Flow
//!
//! ```text
//! MessageSource ──bytes──▶ IngestionPipeline ──decode──▶ validate ──▶ OrderService::ingest
//!                                 │                  │
//!                                 └── DecodeError ───┴── ValidationError: logged, dropped
//! ```
//!
//! Delivery to the order service is at-most-once: a message that fails at
//! any stage is logged and dropped, never retried.

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod pipeline;

use std::future::Future;

use thiserror::Error;

#[cfg(feature = "kafka")]
pub use kafka::KafkaSource;
pub use pipeline::{IngestionPipeline, MessageError, PipelineStats};

/// Errors raised by a message source.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Connecting or subscribing to the broker failed.
    #[error("failed to connect to broker: {0}")]
    Connect(String),

    /// Receiving a message failed. The source remains usable.
    #[error("failed to receive message: {0}")]
    Receive(String),
}

/// A stream of raw message bodies from one topic.
pub trait MessageSource: Send {
    /// Wait for the next message.
    ///
    /// Returns `None` once the source is exhausted. Broker-side errors are
    /// yielded as `Some(Err(_))` and do not end the stream.
    fn next_message(&mut self)
    -> impl Future<Output = Option<Result<Vec<u8>, BrokerError>>> + Send;
}
