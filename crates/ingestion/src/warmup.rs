use order_store::OrderRepository;
use tracing::{info, warn};

use crate::pipeline::OrderCache;

/// Load every stored order into the cache.
///
/// Best effort: a store failure is logged and reported as zero orders loaded.
pub async fn warm_cache(store: &dyn OrderRepository, cache: &OrderCache) -> usize {
    match store.get_all().await {
        Ok(orders) => {
            let count = orders.len();
            for order in orders {
                cache.set(order.order_uid.clone(), order);
            }
            info!("Cache warmed with {} orders", count);
            count
        }
        Err(e) => {
            warn!("Cache warm-up failed, starting with an empty cache: {}", e);
            0
        }
    }
}
