//! Order ingestion: the per-message pipeline and the partition workers that
//! drive it.

pub mod backoff;
pub mod error;
pub mod pipeline;
pub mod state;
pub mod supervisor;
pub mod warmup;
pub mod worker;

pub use backoff::{BackoffPolicy, ConstantBackoff, ExponentialBackoff};
pub use error::PipelineError;
pub use pipeline::{IngestionPipeline, OrderCache};
pub use state::{HandleOutcome, MessageState};
pub use supervisor::supervise_workers;
pub use warmup::warm_cache;
pub use worker::{PartitionWorker, WorkerStats};
