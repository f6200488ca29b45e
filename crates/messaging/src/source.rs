use async_trait::async_trait;
use thiserror::Error;

use crate::message::InboundMessage;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Transport closed")]
    Closed,
}

/// Sequential reader over a single partition.
///
/// A message is only acknowledged through [`commit`](Self::commit). Calling
/// [`rewind`](Self::rewind) instead makes the transport deliver the same
/// offset again on the next fetch.
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message. Must be safe to cancel.
    async fn fetch(&mut self) -> Result<InboundMessage, TransportError>;

    /// Mark `message` and everything before it on the partition as handled
    async fn commit(&mut self, message: &InboundMessage) -> Result<(), TransportError>;

    /// Reposition the partition so `message` is fetched again
    async fn rewind(&mut self, message: &InboundMessage) -> Result<(), TransportError>;

    /// Label used in logs
    fn describe(&self) -> String;
}
