//! Kafka message source.
//!
//! Consumes a single partition of the configured topic, starting at the
//! newest offset when the process starts. Earlier messages are not
//! replayed, and offsets are not committed.

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use tracing::{debug, info, instrument};

use crate::config::BrokerConfig;

use super::{BrokerError, MessageSource};

/// [`MessageSource`] backed by an `rdkafka` stream consumer.
pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl KafkaSource {
    /// Create the consumer and assign the configured partition at its end.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::Connect` if the consumer cannot be created or
    /// the partition cannot be assigned.
    #[instrument(skip_all, fields(broker = %config.broker, topic = %config.topic))]
    pub fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.broker)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        let mut assignment = TopicPartitionList::new();
        assignment
            .add_partition_offset(&config.topic, config.partition, Offset::End)
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        consumer
            .assign(&assignment)
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        info!(partition = config.partition, "Kafka consumer assigned");
        Ok(Self { consumer })
    }
}

impl MessageSource for KafkaSource {
    async fn next_message(&mut self) -> Option<Result<Vec<u8>, BrokerError>> {
        let message = match self.consumer.recv().await {
            Ok(message) => message,
            Err(e) => return Some(Err(BrokerError::Receive(e.to_string()))),
        };

        debug!(
            partition = message.partition(),
            offset = message.offset(),
            "Message received"
        );

        // Tombstones have no payload; they fail decoding like any empty body
        Some(Ok(message.payload().map(<[u8]>::to_vec).unwrap_or_default()))
    }
}
