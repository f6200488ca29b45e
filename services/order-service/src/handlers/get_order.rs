use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use common::metrics::{record_cache_request, record_query};
use domain::Order;
use tracing::{debug, error, info};

use crate::state::AppState;

/// Get a single order by its identifier.
///
/// Served from the cache when possible; a store hit refreshes the cache.
pub async fn get_order_handler(
    State(state): State<AppState>,
    Path(order_uid): Path<String>,
) -> Result<Json<Order>, (StatusCode, String)> {
    if order_uid.trim().is_empty() {
        return Err(missing_order_id().await);
    }
    let order_uid = order_uid.as_str();

    if let Some(order) = state.cache.get(order_uid) {
        debug!(order_uid, "Cache hit");
        record_cache_request(true);
        record_query("ok");
        return Ok(Json(order));
    }
    record_cache_request(false);

    info!(order_uid, "Cache miss, querying database");

    match state.store.get_by_id(order_uid).await {
        Ok(Some(order)) => {
            state.cache.set(order_uid, order.clone());
            record_query("ok");
            Ok(Json(order))
        }
        Ok(None) => {
            info!(order_uid, "Order not found");
            record_query("not_found");
            Err((
                StatusCode::NOT_FOUND,
                format!("Order not found: {}", order_uid),
            ))
        }
        Err(e) => {
            error!(order_uid, "Failed to fetch order: {}", e);
            record_query("error");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ))
        }
    }
}

/// `GET /order/` without an identifier
pub async fn missing_order_id() -> (StatusCode, String) {
    record_query("bad_request");
    (StatusCode::BAD_REQUEST, "Order id is required".to_string())
}
