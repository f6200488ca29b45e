pub mod fixtures;
pub mod models;
pub mod validation;

pub use models::{Delivery, Item, Order, Payment};
pub use validation::{OrderValidationError, OrderValidator, RuleValidator};

/// Decode an order document from its JSON wire form
pub fn decode_order(payload: &[u8]) -> Result<Order, serde_json::Error> {
    serde_json::from_slice(payload)
}
