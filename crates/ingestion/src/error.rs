use domain::OrderValidationError;
use order_store::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("validation: {0}")]
    Validation(#[from] OrderValidationError),

    #[error("persistence: {0}")]
    Persistence(#[from] StoreError),

    #[error("persistence: timed out after {0:?}")]
    PersistenceTimeout(Duration),
}

impl PipelineError {
    /// Transient failures are retried by redelivery; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::Persistence(_) | PipelineError::PersistenceTimeout(_)
        )
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Decode(_) => "decode",
            PipelineError::Validation(_) => "validation",
            PipelineError::Persistence(_) => "persistence",
            PipelineError::PersistenceTimeout(_) => "persistence_timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_persistence_errors_are_transient() {
        let decode = PipelineError::from(serde_json::from_slice::<u8>(b"{").unwrap_err());
        let validation =
            PipelineError::from(OrderValidationError::new(vec!["locale: required".into()]));
        let timeout = PipelineError::PersistenceTimeout(Duration::from_secs(3));
        let store = PipelineError::from(StoreError::Database(sqlx::Error::PoolTimedOut));

        assert!(!decode.is_transient());
        assert!(!validation.is_transient());
        assert!(timeout.is_transient());
        assert!(store.is_transient());
    }

    #[test]
    fn test_display_carries_reason_prefix() {
        let decode = PipelineError::from(serde_json::from_slice::<u8>(b"nope").unwrap_err());
        assert!(decode.to_string().starts_with("decode: "));

        let validation =
            PipelineError::from(OrderValidationError::new(vec!["items: empty".into()]));
        assert_eq!(validation.to_string(), "validation: items: empty");
        assert_eq!(validation.kind(), "validation");
    }
}
