use async_trait::async_trait;
use common::metrics::record_store_operation;
use domain::Order;
use sqlx::types::Json;
use sqlx::PgPool;
use std::time::Instant;
use tracing::{debug, info};

use crate::StoreError;

/// Durable storage for order documents
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Store an order. Inserting an identifier that already exists is a
    /// no-op, so redelivered messages are safe.
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;

    /// Get a single order by its identifier
    async fn get_by_id(&self, order_uid: &str) -> Result<Option<Order>, StoreError>;

    /// Load every stored order
    async fn get_all(&self) -> Result<Vec<Order>, StoreError>;
}

/// PostgreSQL implementation of OrderRepository.
///
/// Orders are stored whole as JSONB keyed by `order_uid`.
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the orders table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                order_uid TEXT PRIMARY KEY,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Orders schema ready");
        Ok(())
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO orders (order_uid, data)
            VALUES ($1, $2)
            ON CONFLICT (order_uid) DO NOTHING
            "#,
        )
        .bind(&order.order_uid)
        .bind(Json(order))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            info!(
                order_uid = %order.order_uid,
                "Order already exists, skipped insert"
            );
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_by_id(&self, order_uid: &str) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Order>>(
            r#"
            SELECT data
            FROM orders
            WHERE order_uid = $1
            "#,
        )
        .bind(order_uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(order)| order))
    }

    async fn fetch_all(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Order>>(
            r#"
            SELECT data
            FROM orders
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|Json(order)| order).collect())
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let start = Instant::now();
        let result = self.insert_order(order).await;
        record_store_operation("insert", result.is_ok(), start.elapsed().as_secs_f64());
        result
    }

    async fn get_by_id(&self, order_uid: &str) -> Result<Option<Order>, StoreError> {
        let start = Instant::now();
        let result = self.fetch_by_id(order_uid).await;
        record_store_operation("get_by_id", result.is_ok(), start.elapsed().as_secs_f64());
        result
    }

    async fn get_all(&self) -> Result<Vec<Order>, StoreError> {
        let start = Instant::now();
        let result = self.fetch_all().await;
        record_store_operation("get_all", result.is_ok(), start.elapsed().as_secs_f64());

        if let Ok(orders) = &result {
            debug!("Loaded {} orders from store", orders.len());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_repository_creation() {
        let pool = PgPool::connect_lazy("postgresql://test").unwrap();
        let repository: Box<dyn OrderRepository> = Box::new(PostgresOrderRepository::new(pool));
        drop(repository);
    }
}
