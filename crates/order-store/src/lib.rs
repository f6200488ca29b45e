pub mod repositories;

pub use repositories::{OrderRepository, PostgresOrderRepository};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
