use common::metrics::{record_dead_letter, record_ingest};
use domain::{decode_order, Order, OrderValidator, RuleValidator};
use messaging::{DeadLetterEnvelope, DeadLetterRouter, InboundMessage};
use order_store::OrderRepository;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use ttl_cache::TtlCache;

use crate::error::PipelineError;
use crate::state::{HandleOutcome, MessageState};

pub type OrderCache = TtlCache<Order>;

const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(3);

/// Turns one raw message into an acknowledge decision.
///
/// Malformed or rule-violating orders are dead-lettered and acknowledged.
/// Orders that could not be persisted are left unacknowledged so the
/// transport redelivers them; the cache is only written after a successful
/// persist.
pub struct IngestionPipeline {
    store: Arc<dyn OrderRepository>,
    cache: Arc<OrderCache>,
    validator: Arc<dyn OrderValidator>,
    dead_letters: Arc<dyn DeadLetterRouter>,
    persist_timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn OrderRepository>,
        cache: Arc<OrderCache>,
        dead_letters: Arc<dyn DeadLetterRouter>,
    ) -> Self {
        Self {
            store,
            cache,
            validator: Arc::new(RuleValidator),
            dead_letters,
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn OrderValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    pub async fn handle(&self, message: &InboundMessage) -> HandleOutcome {
        let start = Instant::now();
        let outcome = self.process(message).await;
        record_ingest(outcome.label(), start.elapsed().as_secs_f64());
        outcome
    }

    async fn process(&self, message: &InboundMessage) -> HandleOutcome {
        let mut outcome = HandleOutcome::received();

        let order = match decode_order(&message.payload) {
            Ok(order) => {
                outcome.advance(MessageState::Decoded);
                order
            }
            Err(e) => {
                outcome.advance(MessageState::DecodeFailed);
                return self.reject(message, e.into(), outcome).await;
            }
        };

        if let Err(e) = self.validator.validate(&order) {
            outcome.advance(MessageState::ValidationFailed);
            return self.reject(message, e.into(), outcome).await;
        }
        outcome.advance(MessageState::Validated);

        if let Err(e) = self.persist(&order).await {
            warn!(
                order_uid = %order.order_uid,
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "Failed to persist order, leaving message for redelivery"
            );
            outcome.advance(MessageState::PersistFailed);
            return outcome;
        }
        outcome.advance(MessageState::Persisted);

        info!(order_uid = %order.order_uid, "Order stored");
        self.cache.set(order.order_uid.clone(), order);
        outcome.advance(MessageState::Cached);

        outcome.advance(MessageState::Acknowledged);
        outcome
    }

    async fn persist(&self, order: &Order) -> Result<(), PipelineError> {
        match tokio::time::timeout(self.persist_timeout, self.store.insert(order)).await {
            Ok(result) => result.map_err(PipelineError::from),
            Err(_) => Err(PipelineError::PersistenceTimeout(self.persist_timeout)),
        }
    }

    /// Route a permanently failed message to the dead-letter sink. The
    /// message is acknowledged whether or not routing succeeds.
    async fn reject(
        &self,
        message: &InboundMessage,
        error: PipelineError,
        mut outcome: HandleOutcome,
    ) -> HandleOutcome {
        warn!(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            error = %error,
            "Rejecting message"
        );

        let envelope = DeadLetterEnvelope::new(message, error.to_string());
        match self.dead_letters.route(&envelope).await {
            Ok(()) => {
                record_dead_letter(error.kind(), true);
                outcome.advance(MessageState::DeadLettered);
            }
            Err(e) => {
                error!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    "Failed to route message to dead-letter topic: {}",
                    e
                );
                record_dead_letter(error.kind(), false);
                outcome.advance(MessageState::DeadLetterFailed);
            }
        }

        debug!(offset = message.offset, "Acknowledging rejected message");
        outcome.advance(MessageState::Acknowledged);
        outcome
    }
}
