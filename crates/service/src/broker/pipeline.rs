//! Ingestion pipeline: broker message to committed, cached order.

use std::sync::Arc;
use std::time::Duration;

use order_service_core::{Order, OrderUid, ValidationError, validate};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::db::{OrderReader, OrderWriter};
use crate::services::{OrderService, OrderServiceError};

use super::MessageSource;

/// Longest payload prefix written to the log for undecodable messages.
const MAX_LOGGED_PAYLOAD: usize = 1024;

/// First pause after a broker error.
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Longest pause between consecutive broker errors.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Why a message was dropped.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The body is not a JSON order.
    #[error("failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),

    /// The body decoded but the order is invalid.
    #[error("invalid order '{uid}': {source}")]
    Validation {
        /// Uid as decoded (may be blank).
        uid: OrderUid,
        source: ValidationError,
    },

    /// The order service refused or failed to store the order.
    #[error("order '{uid}' rejected: {source}")]
    Rejected {
        uid: OrderUid,
        source: OrderServiceError,
    },
}

/// Counters for a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Orders committed and cached.
    pub ingested: u64,
    /// Messages dropped (decode, validation, or persistence failure).
    pub dropped: u64,
    /// Errors reported by the message source.
    pub broker_errors: u64,
}

/// Drives messages from a source into the order service, one at a time.
///
/// Processing is sequential: the next message is not received until the
/// current one is committed or dropped.
pub struct IngestionPipeline<M, S> {
    source: M,
    service: Arc<OrderService<S>>,
    backoff: Backoff,
}

impl<M, S> IngestionPipeline<M, S>
where
    M: MessageSource,
    S: OrderWriter + OrderReader,
{
    /// Create a pipeline feeding `service` from `source`.
    #[must_use]
    pub const fn new(source: M, service: Arc<OrderService<S>>) -> Self {
        Self {
            source,
            service,
            backoff: Backoff::new(INITIAL_BACKOFF, MAX_BACKOFF),
        }
    }

    /// Override the pause taken after consecutive broker errors.
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.backoff = Backoff::new(initial, max);
        self
    }

    /// Consume until the source is exhausted.
    ///
    /// Never fails: every error is logged and counted.
    pub async fn run(mut self) -> PipelineStats {
        info!("Ingestion pipeline started");
        let mut stats = PipelineStats::default();

        while let Some(next) = self.source.next_message().await {
            let payload = match next {
                Ok(payload) => {
                    if self.backoff.failures > 0 {
                        info!(failures = self.backoff.failures, "Broker recovered");
                    }
                    self.backoff.reset();
                    payload
                }
                Err(e) => {
                    // Only the first of a run of errors is reported
                    if self.backoff.failures == 0 {
                        error!(error = %e, "Broker error");
                    } else {
                        debug!(error = %e, failures = self.backoff.failures, "Broker error");
                    }
                    stats.broker_errors += 1;
                    tokio::time::sleep(self.backoff.next_delay()).await;
                    continue;
                }
            };

            match self.handle_message(&payload).await {
                Ok(uid) => {
                    info!(order_uid = %uid, "Order ingested");
                    stats.ingested += 1;
                }
                Err(e) => {
                    log_dropped(&e, &payload);
                    stats.dropped += 1;
                }
            }
        }

        info!(
            ingested = stats.ingested,
            dropped = stats.dropped,
            "Ingestion pipeline stopped"
        );
        stats
    }

    /// Decode, validate, and ingest one message body.
    ///
    /// # Errors
    ///
    /// Returns `MessageError` describing the stage that failed. Nothing is
    /// persisted or cached unless this returns `Ok`.
    #[instrument(skip_all, fields(bytes = payload.len()))]
    pub async fn handle_message(&self, payload: &[u8]) -> Result<OrderUid, MessageError> {
        let order = Order::from_json(payload)?;

        if let Err(source) = validate(&order) {
            return Err(MessageError::Validation {
                uid: order.order_uid,
                source,
            });
        }

        let uid = order.order_uid.clone();
        match self.service.ingest(order).await {
            Ok(()) => Ok(uid),
            Err(source) => Err(MessageError::Rejected { uid, source }),
        }
    }
}

fn log_dropped(err: &MessageError, payload: &[u8]) {
    match err {
        MessageError::Decode(e) => {
            warn!(
                error = %e,
                payload = %payload_preview(payload),
                "Dropping undecodable message"
            );
        }
        MessageError::Validation { uid, source } if uid.is_blank() => {
            warn!(
                error = %source,
                payload = %payload_preview(payload),
                "Dropping invalid order"
            );
        }
        MessageError::Validation { uid, source } => {
            warn!(order_uid = %uid, error = %source, "Dropping invalid order");
        }
        MessageError::Rejected {
            uid,
            source: OrderServiceError::Duplicate(_),
        } => {
            warn!(order_uid = %uid, "Dropping duplicate order");
        }
        MessageError::Rejected { uid, source } => {
            error!(order_uid = %uid, error = %source, "Dropping order that could not be stored");
        }
    }
}

/// Exponential pause between consecutive broker errors.
#[derive(Debug, Clone, Copy)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
    failures: u32,
}

impl Backoff {
    const fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
            failures: 0,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.max);
        self.current = self.current.saturating_mul(2).min(self.max);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    const fn reset(&mut self) {
        self.current = self.initial;
        self.failures = 0;
    }
}

fn payload_preview(payload: &[u8]) -> std::borrow::Cow<'_, str> {
    let shown = payload.get(..MAX_LOGGED_PAYLOAD).unwrap_or(payload);
    String::from_utf8_lossy(shown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_up_to_max() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
        assert_eq!(backoff.failures, 4);
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(5));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.failures, 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_rejected_error_names_uid() {
        let err = MessageError::Rejected {
            uid: OrderUid::new("A1"),
            source: OrderServiceError::Duplicate(OrderUid::new("A1")),
        };
        assert_eq!(err.to_string(), "order 'A1' rejected: order A1 already exists");
    }

    #[test]
    fn test_payload_preview_truncates() {
        let payload = vec![b'x'; MAX_LOGGED_PAYLOAD * 2];
        assert_eq!(payload_preview(&payload).len(), MAX_LOGGED_PAYLOAD);
    }

    #[test]
    fn test_payload_preview_short_payload_unchanged() {
        assert_eq!(payload_preview(b"not json"), "not json");
        assert_eq!(payload_preview(b""), "");
    }

    #[test]
    fn test_payload_preview_tolerates_invalid_utf8() {
        let preview = payload_preview(&[0xff, b'{', 0xfe]);
        assert!(preview.contains('{'));
    }
}
