use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::message::DeadLetterEnvelope;
use crate::producer::{EventPublisher, PublisherError};

#[derive(Debug, Error)]
pub enum DeadLetterError {
    #[error("Failed to encode dead-letter envelope: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Dead-letter sink unavailable: {0}")]
    Unavailable(String),
}

impl From<PublisherError> for DeadLetterError {
    fn from(err: PublisherError) -> Self {
        match err {
            PublisherError::Serialization(e) => DeadLetterError::Encoding(e),
            other => DeadLetterError::Unavailable(other.to_string()),
        }
    }
}

/// Side channel for messages that can never be processed
#[async_trait]
pub trait DeadLetterRouter: Send + Sync {
    async fn route(&self, envelope: &DeadLetterEnvelope) -> Result<(), DeadLetterError>;
}

/// Publishes dead-letter envelopes as JSON to a Kafka topic
pub struct KafkaDeadLetterRouter {
    publisher: EventPublisher,
}

impl KafkaDeadLetterRouter {
    pub fn new(publisher: EventPublisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl DeadLetterRouter for KafkaDeadLetterRouter {
    async fn route(&self, envelope: &DeadLetterEnvelope) -> Result<(), DeadLetterError> {
        let payload = serde_json::to_vec(envelope)?;
        self.publisher
            .publish_bytes(envelope.key.as_deref(), &payload)
            .await?;

        info!(
            topic = %envelope.topic,
            partition = envelope.partition,
            offset = envelope.offset,
            dlq_topic = %self.publisher.topic(),
            "Message routed to dead-letter topic"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_errors_map_to_unavailable() {
        let err: DeadLetterError = PublisherError::PublishFailed("broker down".to_string()).into();
        assert!(matches!(err, DeadLetterError::Unavailable(ref msg) if msg.contains("broker down")));
    }
}
