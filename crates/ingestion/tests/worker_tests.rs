mod support;

use domain::fixtures::sample_order;
use ingestion::{ConstantBackoff, IngestionPipeline, OrderCache, PartitionWorker, WorkerStats};
use messaging::InboundMessage;
use std::sync::Arc;
use std::time::Duration;
use support::{order_message, store_unavailable, MemorySource, MockDeadLetters, MockStore};
use tokio::time::Instant;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

fn worker(
    source: MemorySource,
    store: MockStore,
    dead_letters: MockDeadLetters,
    cache: &Arc<OrderCache>,
) -> PartitionWorker<MemorySource> {
    let pipeline =
        IngestionPipeline::new(Arc::new(store), Arc::clone(cache), Arc::new(dead_letters));
    PartitionWorker::new(
        source,
        Arc::new(pipeline),
        Arc::new(ConstantBackoff::new(Duration::from_secs(2))),
    )
}

fn new_cache() -> Arc<OrderCache> {
    Arc::new(OrderCache::new(Duration::from_secs(300)))
}

#[tokio::test]
async fn test_commits_messages_in_partition_order() {
    let orders = [sample_order("seq-1"), sample_order("seq-2"), sample_order("seq-3")];
    let messages = orders
        .iter()
        .enumerate()
        .map(|(offset, order)| order_message(offset as i64, order))
        .collect();
    let source = MemorySource::new(messages);
    let log = source.log();

    let mut store = MockStore::new();
    store.expect_insert().times(3).returning(|_| Ok(()));
    let mut dead_letters = MockDeadLetters::new();
    dead_letters.expect_route().never();

    let cache = new_cache();
    let stats = worker(source, store, dead_letters, &cache)
        .run(CancellationToken::new())
        .await;

    assert_eq!(
        stats,
        WorkerStats {
            committed: 3,
            redeliveries: 0,
            transport_errors: 0,
        }
    );
    assert_eq!(log.lock().unwrap().committed, vec![0, 1, 2]);
    assert_eq!(cache.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_rewinds_and_waits_backoff() {
    let first = sample_order("retry-1");
    let second = sample_order("retry-2");
    let source = MemorySource::new(vec![order_message(0, &first), order_message(1, &second)]);
    let log = source.log();

    let mut calls = 0;
    let mut store = MockStore::new();
    store.expect_insert().times(3).returning(move |_| {
        calls += 1;
        if calls == 1 {
            Err(store_unavailable())
        } else {
            Ok(())
        }
    });
    let mut dead_letters = MockDeadLetters::new();
    dead_letters.expect_route().never();

    let cache = new_cache();
    let started = Instant::now();
    let stats = worker(source, store, dead_letters, &cache)
        .run(CancellationToken::new())
        .await;

    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(stats.redeliveries, 1);
    assert_eq!(stats.committed, 2);

    let log = log.lock().unwrap();
    assert_eq!(log.fetched, vec![0, 0, 1]);
    assert_eq!(log.rewound, vec![0]);
    assert_eq!(log.committed, vec![0, 1]);
    assert!(cache.get("retry-1").is_some());
}

#[tokio::test]
async fn test_dead_lettered_message_is_committed() {
    let source = MemorySource::new(vec![InboundMessage::new("orders", 0, 0, b"][".to_vec())]);
    let log = source.log();

    let mut store = MockStore::new();
    store.expect_insert().never();
    let mut dead_letters = MockDeadLetters::new();
    dead_letters.expect_route().times(1).returning(|_| Ok(()));

    let stats = worker(source, store, dead_letters, &new_cache())
        .run(CancellationToken::new())
        .await;

    assert_eq!(stats.committed, 1);
    assert_eq!(log.lock().unwrap().committed, vec![0]);
}

#[tokio::test]
async fn test_idle_worker_stops_on_cancellation() {
    let source = MemorySource::new(Vec::new()).idle_when_drained();
    let log = source.log();

    let mut store = MockStore::new();
    store.expect_insert().never();
    let dead_letters = MockDeadLetters::new();

    let shutdown = CancellationToken::new();
    let worker = worker(source, store, dead_letters, &new_cache());
    let task = tokio::spawn(worker.run(shutdown.clone()));

    shutdown.cancel();
    let stats = assert_ok!(task.await);

    assert_eq!(stats, WorkerStats::default());
    assert!(log.lock().unwrap().committed.is_empty());
}

#[tokio::test]
async fn test_in_flight_message_is_not_committed_after_shutdown() {
    let source = MemorySource::new(vec![
        order_message(0, &sample_order("inflight-1")),
        order_message(1, &sample_order("inflight-2")),
    ]);
    let log = source.log();

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    let mut store = MockStore::new();
    store.expect_insert().times(1).returning(move |_| {
        trigger.cancel();
        Ok(())
    });
    let dead_letters = MockDeadLetters::new();

    let stats = worker(source, store, dead_letters, &new_cache())
        .run(shutdown)
        .await;

    let log = log.lock().unwrap();
    assert_eq!(stats.committed, 0);
    assert_eq!(log.fetched, vec![0]);
    assert!(log.committed.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_backoff() {
    let source = MemorySource::new(vec![order_message(0, &sample_order("stuck-1"))]);
    let log = source.log();

    let mut store = MockStore::new();
    store
        .expect_insert()
        .times(1)
        .returning(|_| Err(store_unavailable()));
    let dead_letters = MockDeadLetters::new();

    let shutdown = CancellationToken::new();
    let worker = worker(source, store, dead_letters, &new_cache());
    let task = tokio::spawn(worker.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown.cancel();
    let stats = assert_ok!(task.await);

    assert_eq!(stats.redeliveries, 1);
    assert_eq!(log.lock().unwrap().rewound, vec![0]);
    assert!(log.lock().unwrap().committed.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_rewind_is_retried_before_fetching_again() {
    let source = MemorySource::new(vec![
        order_message(0, &sample_order("lost-1")),
        order_message(1, &sample_order("lost-2")),
    ])
    .failing_rewinds(1);
    let log = source.log();

    let mut calls = 0;
    let mut store = MockStore::new();
    store.expect_insert().times(3).returning(move |_| {
        calls += 1;
        if calls == 1 {
            Err(store_unavailable())
        } else {
            Ok(())
        }
    });
    let mut dead_letters = MockDeadLetters::new();
    dead_letters.expect_route().never();

    let cache = new_cache();
    let stats = worker(source, store, dead_letters, &cache)
        .run(CancellationToken::new())
        .await;

    let log = log.lock().unwrap();
    assert_eq!(log.failed_rewinds, 1);
    assert_eq!(log.rewound, vec![0]);
    assert_eq!(log.fetched, vec![0, 0, 1]);
    assert_eq!(log.committed, vec![0, 1]);
    assert_eq!(stats.transport_errors, 1);
    assert!(cache.get("lost-1").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_rewind_retries_without_committing() {
    let source = MemorySource::new(vec![
        order_message(0, &sample_order("seek-1")),
        order_message(1, &sample_order("seek-2")),
    ])
    .failing_rewinds(usize::MAX);
    let log = source.log();

    let mut store = MockStore::new();
    store
        .expect_insert()
        .times(1)
        .returning(|_| Err(store_unavailable()));
    let dead_letters = MockDeadLetters::new();

    let shutdown = CancellationToken::new();
    let worker = worker(source, store, dead_letters, &new_cache());
    let task = tokio::spawn(worker.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_secs(10)).await;
    shutdown.cancel();
    let stats = assert_ok!(task.await);

    let log = log.lock().unwrap();
    assert!(log.failed_rewinds >= 2);
    assert_eq!(log.fetched, vec![0]);
    assert!(log.committed.is_empty());
    assert_eq!(stats.committed, 0);
}
