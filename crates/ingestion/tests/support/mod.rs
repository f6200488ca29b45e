#![allow(dead_code)]

use async_trait::async_trait;
use domain::Order;
use messaging::{
    DeadLetterEnvelope, DeadLetterError, DeadLetterRouter, InboundMessage, MessageSource,
    TransportError,
};
use mockall::mock;
use order_store::{OrderRepository, StoreError};
use rdkafka::error::KafkaError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mock! {
    pub Store {}

    #[async_trait]
    impl OrderRepository for Store {
        async fn insert(&self, order: &Order) -> Result<(), StoreError>;
        async fn get_by_id(&self, order_uid: &str) -> Result<Option<Order>, StoreError>;
        async fn get_all(&self) -> Result<Vec<Order>, StoreError>;
    }
}

mock! {
    pub DeadLetters {}

    #[async_trait]
    impl DeadLetterRouter for DeadLetters {
        async fn route(&self, envelope: &DeadLetterEnvelope) -> Result<(), DeadLetterError>;
    }
}

pub fn store_unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

pub fn order_message(offset: i64, order: &Order) -> InboundMessage {
    let payload = serde_json::to_vec(order).expect("order serializes");
    InboundMessage::new("orders", 0, offset, payload).with_key(order.order_uid.clone())
}

/// Store whose inserts never finish within any reasonable deadline
pub struct SlowStore {
    pub delay: Duration,
}

#[async_trait]
impl OrderRepository for SlowStore {
    async fn insert(&self, _order: &Order) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn get_by_id(&self, _order_uid: &str) -> Result<Option<Order>, StoreError> {
        Ok(None)
    }

    async fn get_all(&self) -> Result<Vec<Order>, StoreError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Default)]
pub struct SourceLog {
    pub fetched: Vec<i64>,
    pub committed: Vec<i64>,
    pub rewound: Vec<i64>,
    pub failed_rewinds: usize,
}

/// Partition source backed by a queue; rewinding puts the message back in
/// front.
pub struct MemorySource {
    pending: VecDeque<InboundMessage>,
    close_when_drained: bool,
    failing_rewinds: usize,
    log: Arc<Mutex<SourceLog>>,
}

impl MemorySource {
    pub fn new(messages: Vec<InboundMessage>) -> Self {
        Self {
            pending: messages.into(),
            close_when_drained: true,
            failing_rewinds: 0,
            log: Arc::default(),
        }
    }

    /// Block on fetch once drained instead of closing
    pub fn idle_when_drained(mut self) -> Self {
        self.close_when_drained = false;
        self
    }

    /// Make the next `count` rewinds fail with a seek error
    pub fn failing_rewinds(mut self, count: usize) -> Self {
        self.failing_rewinds = count;
        self
    }

    pub fn log(&self) -> Arc<Mutex<SourceLog>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn fetch(&mut self) -> Result<InboundMessage, TransportError> {
        match self.pending.pop_front() {
            Some(message) => {
                self.log.lock().unwrap().fetched.push(message.offset);
                Ok(message)
            }
            None if self.close_when_drained => Err(TransportError::Closed),
            None => std::future::pending().await,
        }
    }

    async fn commit(&mut self, message: &InboundMessage) -> Result<(), TransportError> {
        self.log.lock().unwrap().committed.push(message.offset);
        Ok(())
    }

    async fn rewind(&mut self, message: &InboundMessage) -> Result<(), TransportError> {
        if self.failing_rewinds > 0 {
            self.failing_rewinds -= 1;
            self.log.lock().unwrap().failed_rewinds += 1;
            return Err(KafkaError::Seek("broker unavailable".to_string()).into());
        }
        self.log.lock().unwrap().rewound.push(message.offset);
        self.pending.push_front(message.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory/0".to_string()
    }
}
