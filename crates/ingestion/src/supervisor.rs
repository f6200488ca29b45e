use messaging::MessageSource;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::backoff::BackoffPolicy;
use crate::pipeline::IngestionPipeline;
use crate::worker::{PartitionWorker, WorkerStats};

/// Start a [`PartitionWorker`] for every source received on `sources`.
///
/// Sources may arrive at any time, e.g. when partitions are added to the
/// topic after startup. Once `shutdown` fires or the sender side is dropped,
/// waits for every running worker and returns their combined stats.
pub async fn supervise_workers<S>(
    mut sources: UnboundedReceiver<S>,
    pipeline: Arc<IngestionPipeline>,
    backoff: Arc<dyn BackoffPolicy>,
    shutdown: CancellationToken,
) -> WorkerStats
where
    S: MessageSource + 'static,
{
    let mut workers = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = sources.recv() => match received {
                Some(source) => {
                    let worker =
                        PartitionWorker::new(source, Arc::clone(&pipeline), Arc::clone(&backoff));
                    workers.spawn(worker.run(shutdown.clone()));
                }
                None => break,
            },
        }
    }

    let mut total = WorkerStats::default();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(stats) => total += stats,
            Err(e) => error!("Partition worker task failed: {}", e),
        }
    }

    info!(
        committed = total.committed,
        redeliveries = total.redeliveries,
        transport_errors = total.transport_errors,
        "All partition workers stopped"
    );
    total
}
