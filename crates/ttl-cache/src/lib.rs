//! Concurrent in-memory TTL cache used as the read-through layer in front of
//! the order store.

mod sweeper;
mod ttl_cache;

pub use sweeper::SweeperHandle;
pub use ttl_cache::TtlCache;
