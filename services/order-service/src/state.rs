use ingestion::OrderCache;
use order_store::OrderRepository;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderRepository>,
    pub cache: Arc<OrderCache>,
}

impl AppState {
    pub fn new(store: Arc<dyn OrderRepository>, cache: Arc<OrderCache>) -> Self {
        Self { store, cache }
    }
}
