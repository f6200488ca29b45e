use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::sweeper::SweeperHandle;

/// Shortest sweep period, so a zero TTL never builds a zero-period interval
const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(1);

struct CacheEntry<V> {
    value: V,
    refreshed_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.refreshed_at) > ttl
    }
}

/// In-memory map whose entries stop being served once older than the TTL.
///
/// Reads re-check the age of the entry they find, so an expired value is
/// never returned regardless of when the background sweep last ran. Every
/// `set` resets the entry's age.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        info!("In-memory cache initialized with TTL: {:?}", ttl);
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a live value, evicting the entry if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(self.ttl, Instant::now()) => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // A writer may have refreshed the entry between the two locks.
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(self.ttl, Instant::now()) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                debug!("Evicted expired cache entry: {}", key);
                None
            }
            None => None,
        }
    }

    /// Insert or overwrite a value and restart its TTL
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            refreshed_at: Instant::now(),
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Remove a value; absent keys are ignored
    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Number of entries physically held, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
        before - entries.len()
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Start the periodic sweep, running once per TTL.
    ///
    /// The task runs until [`SweeperHandle::shutdown`] is awaited or the
    /// handle is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let cache = Arc::clone(self);
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let period = self.ttl.max(MIN_SWEEP_PERIOD);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            debug!(removed, remaining = cache.len(), "Cache sweep evicted expired entries");
                        }
                    }
                }
            }

            debug!("Cache sweeper stopped");
        });

        SweeperHandle::new(token, task)
    }
}
