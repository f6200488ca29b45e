use messaging::{InboundMessage, MessageSource, TransportError};
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::BackoffPolicy;
use crate::pipeline::IngestionPipeline;

/// Counters reported when a worker exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub committed: u64,
    pub redeliveries: u64,
    pub transport_errors: u64,
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.committed += other.committed;
        self.redeliveries += other.redeliveries;
        self.transport_errors += other.transport_errors;
    }
}

/// Sequential fetch → handle → commit loop over one partition.
///
/// A message that fails transiently is rewound and fetched again after the
/// backoff delay, so nothing behind it on the partition is processed first.
pub struct PartitionWorker<S> {
    source: S,
    pipeline: Arc<IngestionPipeline>,
    backoff: Arc<dyn BackoffPolicy>,
}

impl<S: MessageSource> PartitionWorker<S> {
    pub fn new(
        source: S,
        pipeline: Arc<IngestionPipeline>,
        backoff: Arc<dyn BackoffPolicy>,
    ) -> Self {
        Self {
            source,
            pipeline,
            backoff,
        }
    }

    /// Run until `shutdown` is cancelled or the source closes
    pub async fn run(mut self, shutdown: CancellationToken) -> WorkerStats {
        let name = self.source.describe();
        info!(source = %name, "Partition worker started");

        let mut stats = WorkerStats::default();
        let mut failures: u32 = 0;

        loop {
            let fetched = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                fetched = self.source.fetch() => fetched,
            };

            let message = match fetched {
                Ok(message) => message,
                Err(TransportError::Closed) => {
                    info!(source = %name, "Message source closed");
                    break;
                }
                Err(e) => {
                    error!(source = %name, "Failed to fetch message: {}", e);
                    stats.transport_errors += 1;
                    failures = failures.saturating_add(1);
                    if !pause(self.backoff.delay(failures), &shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            let outcome = self.pipeline.handle(&message).await;

            if shutdown.is_cancelled() {
                info!(
                    source = %name,
                    offset = message.offset,
                    "Shutdown requested, leaving in-flight message uncommitted"
                );
                break;
            }

            if outcome.should_acknowledge() {
                failures = 0;
                self.commit(&message, &mut stats).await;
            } else {
                failures = failures.saturating_add(1);
                stats.redeliveries += 1;
                if !self.rewind(&message, failures, &shutdown, &mut stats).await {
                    break;
                }
                if !pause(self.backoff.delay(failures), &shutdown).await {
                    break;
                }
            }
        }

        info!(
            source = %name,
            committed = stats.committed,
            redeliveries = stats.redeliveries,
            "Partition worker stopped"
        );
        stats
    }

    /// Reposition the partition on `message`, retrying under backoff.
    ///
    /// Fetching again before the rewind succeeds would move past an
    /// unpersisted message, so this only returns once the partition is
    /// rewound (true) or the worker has to stop (false).
    async fn rewind(
        &mut self,
        message: &InboundMessage,
        mut attempt: u32,
        shutdown: &CancellationToken,
        stats: &mut WorkerStats,
    ) -> bool {
        loop {
            match self.source.rewind(message).await {
                Ok(()) => return true,
                Err(TransportError::Closed) => {
                    info!(offset = message.offset, "Message source closed during rewind");
                    return false;
                }
                Err(e) => {
                    error!(
                        offset = message.offset,
                        "Failed to rewind partition: {}",
                        e
                    );
                    stats.transport_errors += 1;
                    attempt = attempt.saturating_add(1);
                    if !pause(self.backoff.delay(attempt), shutdown).await {
                        return false;
                    }
                }
            }
        }
    }

    async fn commit(&mut self, message: &InboundMessage, stats: &mut WorkerStats) {
        match self.source.commit(message).await {
            Ok(()) => {
                debug!(offset = message.offset, "Offset committed");
                stats.committed += 1;
            }
            // Redelivered on restart; the insert is idempotent
            Err(e) => {
                error!(offset = message.offset, "Failed to commit offset: {}", e);
                stats.transport_errors += 1;
            }
        }
    }
}

/// Wait out the backoff delay. Returns false if shutdown interrupted it.
async fn pause(delay: Duration, shutdown: &CancellationToken) -> bool {
    warn!("Retrying in {:?}", delay);

    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
