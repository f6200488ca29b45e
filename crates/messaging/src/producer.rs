use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("Failed to create Kafka producer: {0}")]
    ProducerCreation(String),

    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to publish message: {0}")]
    PublishFailed(String),
}

/// Kafka publisher bound to a single topic
pub struct EventPublisher {
    producer: FutureProducer,
    topic: String,
}

impl EventPublisher {
    /// Create a new EventPublisher
    ///
    /// # Arguments
    /// * `brokers` - Comma-separated list of Kafka brokers (e.g., "localhost:9092")
    /// * `topic` - The topic to publish to
    ///
    /// # Example
    /// ```no_run
    /// use messaging::EventPublisher;
    ///
    /// let publisher = EventPublisher::new("localhost:9092", "orders".to_string())
    ///     .expect("Failed to create publisher");
    /// ```
    pub fn new(brokers: &str, topic: String) -> Result<Self, PublisherError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("compression.type", "snappy")
            .set("acks", "all") // Wait for all replicas to acknowledge
            .set("retries", "3") // Retry failed sends
            .create()
            .map_err(|e| PublisherError::ProducerCreation(e.to_string()))?;

        debug!("Kafka producer created for topic: {}", topic);

        Ok(Self { producer, topic })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish a JSON-serialized value keyed by `key`
    ///
    /// # Example
    /// ```no_run
    /// use messaging::EventPublisher;
    /// use domain::fixtures::sample_order;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let publisher = EventPublisher::new("localhost:9092", "orders".to_string())?;
    /// let order = sample_order("b563feb7b2b84b6test");
    ///
    /// publisher.publish(&order.order_uid, &order).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn publish<T: Serialize>(&self, key: &str, value: &T) -> Result<(), PublisherError> {
        let payload = serde_json::to_vec(value)?;
        self.publish_bytes(Some(key.as_bytes()), &payload).await
    }

    /// Publish an already-encoded payload
    pub async fn publish_bytes(
        &self,
        key: Option<&[u8]>,
        payload: &[u8],
    ) -> Result<(), PublisherError> {
        let mut record = FutureRecord::<[u8], [u8]>::to(&self.topic).payload(payload);
        if let Some(key) = key {
            record = record.key(key);
        }

        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(5)))
            .await
        {
            Ok((partition, offset)) => {
                debug!(
                    "Message published to topic '{}', partition {}, offset {}",
                    self.topic, partition, offset
                );
                Ok(())
            }
            Err((err, _)) => {
                warn!("Failed to publish to topic '{}': {}", self.topic, err);
                Err(PublisherError::PublishFailed(err.to_string()))
            }
        }
    }
}
