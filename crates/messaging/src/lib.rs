//! Transport layer: Kafka consumer/producer plus the transport-neutral
//! traits the ingestion pipeline is written against.

pub mod consumer;
pub mod dead_letter;
pub mod message;
pub mod producer;
pub mod source;

pub use consumer::{ConsumerError, KafkaPartitionSource, PartitionedConsumer};
pub use dead_letter::{DeadLetterError, DeadLetterRouter, KafkaDeadLetterRouter};
pub use message::{DeadLetterEnvelope, InboundMessage};
pub use producer::{EventPublisher, PublisherError};
pub use source::{MessageSource, TransportError};
