use anyhow::Result;
use common::ServiceConfig;
use ingestion::{backoff, supervise_workers, IngestionPipeline, OrderCache};
use messaging::{EventPublisher, KafkaDeadLetterRouter, PartitionedConsumer};
use order_store::OrderRepository;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Spawn the consumer driver and the worker supervisor. The driver hands
/// each partition of the input topic to the supervisor as it is discovered,
/// so a topic that does not exist yet only delays ingestion. Every task
/// exits once `shutdown` is cancelled.
pub fn start_workers(
    config: &ServiceConfig,
    store: Arc<dyn OrderRepository>,
    cache: Arc<OrderCache>,
    shutdown: CancellationToken,
) -> Result<Vec<JoinHandle<()>>> {
    info!("Creating Kafka consumer...");
    let consumer = PartitionedConsumer::new(
        &config.kafka.brokers,
        &config.kafka.consumer_group,
        &config.kafka.topic,
    )?;

    let dead_letter_publisher =
        EventPublisher::new(&config.kafka.brokers, config.kafka.dead_letter_topic.clone())?;
    let dead_letters = Arc::new(KafkaDeadLetterRouter::new(dead_letter_publisher));

    let pipeline = Arc::new(
        IngestionPipeline::new(store, cache, dead_letters)
            .with_persist_timeout(config.retry.persist_timeout),
    );
    let backoff = backoff::from_config(&config.retry);

    let (sources, received) = mpsc::unbounded_channel();
    info!(
        "Partition workers for topic {} start as partitions are discovered",
        consumer.topic()
    );

    let driver_shutdown = shutdown.clone();
    let supervisor = tokio::spawn(async move {
        supervise_workers(received, pipeline, backoff, shutdown).await;
    });
    let driver = tokio::spawn(async move {
        consumer.drive(sources, driver_shutdown).await;
    });

    Ok(vec![supervisor, driver])
}
