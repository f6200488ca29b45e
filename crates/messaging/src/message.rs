use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record fetched from the ingest topic, detached from the transport client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload,
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Failure record published for a message that can never be processed.
///
/// `payload` holds the original bytes untouched, so undecodable messages
/// survive the trip to the dead-letter topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterEnvelope {
    pub error: String,
    pub payload: Vec<u8>,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: DateTime<Utc>,

    /// Key of the original message, reused as the dead-letter record key
    #[serde(skip)]
    pub key: Option<Vec<u8>>,
}

impl DeadLetterEnvelope {
    pub fn new(message: &InboundMessage, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            payload: message.payload.clone(),
            topic: message.topic.clone(),
            partition: message.partition,
            offset: message.offset,
            timestamp: Utc::now(),
            key: message.key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_keeps_original_bytes_and_position() {
        let message = InboundMessage::new("orders", 3, 42, b"{not-valid-json".to_vec()).with_key("k-1");
        let envelope = DeadLetterEnvelope::new(&message, "decode: expected value");

        assert_eq!(envelope.payload, b"{not-valid-json");
        assert_eq!(envelope.topic, "orders");
        assert_eq!(envelope.partition, 3);
        assert_eq!(envelope.offset, 42);
        assert_eq!(envelope.key.as_deref(), Some(&b"k-1"[..]));
    }

    #[test]
    fn test_envelope_wire_format() {
        let message = InboundMessage::new("orders", 0, 7, vec![0xff, 0x00]);
        let envelope = DeadLetterEnvelope::new(&message, "decode: invalid utf-8");

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["error"], "decode: invalid utf-8");
        assert_eq!(json["payload"], serde_json::json!([255, 0]));
        assert_eq!(json["topic"], "orders");
        assert_eq!(json["partition"], 0);
        assert_eq!(json["offset"], 7);
        assert!(json["timestamp"].is_string());
        assert!(json.get("key").is_none());
    }
}
