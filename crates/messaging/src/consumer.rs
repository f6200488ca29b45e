use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::stream_consumer::StreamPartitionQueue;
use rdkafka::consumer::{CommitMode, Consumer, DefaultConsumerContext, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::{Offset, TopicPartitionList};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::message::InboundMessage;
use crate::source::{MessageSource, TransportError};

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);
const SEEK_TIMEOUT: Duration = Duration::from_secs(5);
const DISCOVERY_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("Failed to create Kafka consumer: {0}")]
    ConsumerCreation(#[from] rdkafka::error::KafkaError),

    #[error("Failed to fetch topic metadata: {0}")]
    Metadata(rdkafka::error::KafkaError),

    #[error("Topic not found in cluster metadata: {0}")]
    UnknownTopic(String),

    #[error("Metadata lookup aborted: {0}")]
    Discovery(String),
}

/// Partitions that already have a split queue
#[derive(Debug, Default)]
struct PartitionRegistry {
    claimed: HashSet<i32>,
}

impl PartitionRegistry {
    /// Claim the ids not seen before, in ascending order
    fn claim_new(&mut self, ids: impl IntoIterator<Item = i32>) -> Vec<i32> {
        let mut fresh: Vec<i32> = ids
            .into_iter()
            .filter(|id| self.claimed.insert(*id))
            .collect();
        fresh.sort_unstable();
        fresh
    }

    fn release(&mut self, id: i32) {
        self.claimed.remove(&id);
    }
}

/// Kafka consumer that hands out one sequential source per partition.
///
/// Offsets are never committed automatically; each partition source commits
/// only what its worker acknowledges.
pub struct PartitionedConsumer {
    consumer: Arc<StreamConsumer>,
    topic: String,
    registry: Mutex<PartitionRegistry>,
}

impl PartitionedConsumer {
    /// Create a new Kafka consumer subscribed to `topic`
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, ConsumerError> {
        info!(
            "Creating Kafka consumer with group_id: {}, topic: {}",
            group_id, topic
        );

        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", group_id)
            .set("bootstrap.servers", brokers)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "10000")
            .create()?;

        consumer.subscribe(&[topic])?;

        info!("Kafka consumer created successfully");
        Ok(Self {
            consumer: Arc::new(consumer),
            topic: topic.to_string(),
            registry: Mutex::new(PartitionRegistry::default()),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Partition ids of the subscribed topic, from cluster metadata.
    /// The lookup blocks, so it runs on the blocking pool.
    async fn partition_ids(&self) -> Result<Vec<i32>, ConsumerError> {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();

        tokio::task::spawn_blocking(move || {
            let metadata = consumer
                .fetch_metadata(Some(&topic), METADATA_TIMEOUT)
                .map_err(ConsumerError::Metadata)?;

            metadata
                .topics()
                .iter()
                .find(|t| t.name() == topic)
                .filter(|t| !t.partitions().is_empty())
                .map(|t| t.partitions().iter().map(|p| p.id()).collect())
                .ok_or(ConsumerError::UnknownTopic(topic))
        })
        .await
        .map_err(|e| ConsumerError::Discovery(e.to_string()))?
    }

    /// Split queues for partitions of the topic that do not have one yet
    pub async fn discover_partitions(&self) -> Result<Vec<KafkaPartitionSource>, ConsumerError> {
        let ids = self.partition_ids().await?;
        let fresh = self.registry.lock().claim_new(ids);

        Ok(fresh
            .into_iter()
            .filter_map(|partition| self.split(partition))
            .collect())
    }

    /// A partition whose queue cannot be split is released so the next
    /// discovery round tries again.
    fn split(&self, partition: i32) -> Option<KafkaPartitionSource> {
        match self.consumer.split_partition_queue(&self.topic, partition) {
            Some(queue) => {
                debug!("Split queue for {}/{}", self.topic, partition);
                Some(KafkaPartitionSource {
                    consumer: Arc::clone(&self.consumer),
                    queue,
                    topic: self.topic.clone(),
                    partition,
                })
            }
            None => {
                warn!("Could not split queue for {}/{}", self.topic, partition);
                self.registry.lock().release(partition);
                None
            }
        }
    }

    /// Poll the main queue and watch the topic's partitions until `shutdown`
    /// fires. Every newly split partition source is sent on `sources`.
    ///
    /// Group membership and rebalances only progress while the main queue is
    /// polled, even though messages arrive on the split partition queues.
    /// A missing topic is not fatal: discovery repeats every
    /// `DISCOVERY_INTERVAL` until the topic and its partitions show up.
    pub async fn drive(
        &self,
        sources: UnboundedSender<KafkaPartitionSource>,
        shutdown: CancellationToken,
    ) {
        let mut discovery = tokio::time::interval(DISCOVERY_INTERVAL);
        discovery.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = discovery.tick() => self.publish_new_partitions(&sources).await,
                result = self.consumer.recv() => match result {
                    Ok(message) => {
                        let (partition, offset) = (message.partition(), message.offset());
                        drop(message);
                        self.adopt(partition, offset, &sources);
                    }
                    Err(e) => {
                        error!("Kafka error while polling main queue: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                },
            }
        }

        info!("Kafka consumer driver stopped");
    }

    async fn publish_new_partitions(&self, sources: &UnboundedSender<KafkaPartitionSource>) {
        match self.discover_partitions().await {
            Ok(found) => {
                for source in found {
                    publish(source, sources);
                }
            }
            Err(ConsumerError::UnknownTopic(topic)) => warn!(
                "Topic {} not available yet, checking again in {:?}",
                topic, DISCOVERY_INTERVAL
            ),
            Err(e) => warn!(
                "Partition discovery failed, retrying in {:?}: {}",
                DISCOVERY_INTERVAL, e
            ),
        }
    }

    /// A message reached the main queue, so its partition has no split
    /// queue yet. Split one and seek back so the message is redelivered
    /// there instead of being skipped.
    fn adopt(
        &self,
        partition: i32,
        offset: i64,
        sources: &UnboundedSender<KafkaPartitionSource>,
    ) {
        let unclaimed = !self.registry.lock().claim_new([partition]).is_empty();
        if unclaimed {
            match self.split(partition) {
                Some(source) => publish(source, sources),
                None => return,
            }
        }

        match self
            .consumer
            .seek(&self.topic, partition, Offset::Offset(offset), SEEK_TIMEOUT)
        {
            Ok(()) => debug!(
                "Returned {}/{} offset {} to its partition queue",
                self.topic, partition, offset
            ),
            Err(e) => error!(
                "Failed to seek {}/{} back to offset {}: {}",
                self.topic, partition, offset, e
            ),
        }
    }
}

fn publish(source: KafkaPartitionSource, sources: &UnboundedSender<KafkaPartitionSource>) {
    let name = source.describe();
    match sources.send(source) {
        Ok(()) => info!("Partition {} handed to a worker", name),
        Err(_) => debug!("No worker supervisor listening, dropping {}", name),
    }
}

/// Message source bound to one partition of a [`PartitionedConsumer`]
pub struct KafkaPartitionSource {
    consumer: Arc<StreamConsumer>,
    queue: StreamPartitionQueue<DefaultConsumerContext>,
    topic: String,
    partition: i32,
}

impl KafkaPartitionSource {
    pub fn partition(&self) -> i32 {
        self.partition
    }
}

fn to_inbound(message: &BorrowedMessage<'_>) -> InboundMessage {
    InboundMessage {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(<[u8]>::to_vec),
        payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
    }
}

#[async_trait]
impl MessageSource for KafkaPartitionSource {
    async fn fetch(&mut self) -> Result<InboundMessage, TransportError> {
        let message = self.queue.recv().await?;
        debug!(
            "Received message from topic: {}, partition: {}, offset: {}",
            message.topic(),
            message.partition(),
            message.offset()
        );
        Ok(to_inbound(&message))
    }

    async fn commit(&mut self, message: &InboundMessage) -> Result<(), TransportError> {
        let mut offsets = TopicPartitionList::new();
        offsets.add_partition_offset(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset + 1),
        )?;
        self.consumer.commit(&offsets, CommitMode::Async)?;
        Ok(())
    }

    async fn rewind(&mut self, message: &InboundMessage) -> Result<(), TransportError> {
        self.consumer.seek(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset),
            SEEK_TIMEOUT,
        )?;
        debug!(
            "Rewound {}/{} to offset {}",
            message.topic, message.partition, message.offset
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.topic, self.partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_consumer_creation_invalid_broker() {
        let result = PartitionedConsumer::new("invalid:9092", "test-group", "test-topic");
        // Should succeed in creation (connection happens on poll)
        assert!(result.is_ok());
        assert_eq!(result.unwrap().topic(), "test-topic");
    }

    #[test]
    fn test_registry_claims_each_partition_once() {
        let mut registry = PartitionRegistry::default();

        assert_eq!(registry.claim_new([2, 0, 1]), vec![0, 1, 2]);
        assert!(registry.claim_new([0, 1, 2]).is_empty());
        assert_eq!(registry.claim_new([1, 3, 3]), vec![3]);
    }

    #[test]
    fn test_released_partition_can_be_claimed_again() {
        let mut registry = PartitionRegistry::default();
        registry.claim_new([0, 1]);

        registry.release(1);

        assert_eq!(registry.claim_new([0, 1]), vec![1]);
    }
}
