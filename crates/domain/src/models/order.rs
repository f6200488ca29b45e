use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Order document as carried on the ingest topic and stored in the database.
///
/// Absent fields decode to their zero value so that the validator, not the
/// decoder, reports missing data. Only malformed JSON and type mismatches
/// fail to decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Order {
    #[validate(length(min = 1, message = "Order UID cannot be empty"))]
    pub order_uid: String,

    #[validate(length(min = 1, message = "Track number cannot be empty"))]
    pub track_number: String,

    #[validate(length(min = 1, message = "Entry cannot be empty"))]
    pub entry: String,

    #[serde(deserialize_with = "null_as_default")]
    #[validate(nested)]
    pub delivery: Delivery,

    #[serde(deserialize_with = "null_as_default")]
    #[validate(nested)]
    pub payment: Payment,

    #[serde(deserialize_with = "null_as_default")]
    #[validate(length(min = 1, message = "Order must have at least one item"), nested)]
    pub items: Vec<Item>,

    pub locale: String,

    pub internal_signature: String,

    #[validate(length(min = 1, message = "Customer ID cannot be empty"))]
    pub customer_id: String,

    pub delivery_service: String,

    pub shardkey: String,

    pub sm_id: i64,

    #[validate(length(min = 1, message = "Creation date cannot be empty"))]
    pub date_created: String,

    pub oof_shard: String,
}

/// Recipient and address of an order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Delivery {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,

    #[validate(length(min = 1, message = "Phone cannot be empty"))]
    pub phone: String,

    #[validate(length(min = 1, message = "ZIP code cannot be empty"))]
    pub zip: String,

    #[validate(length(min = 1, message = "City cannot be empty"))]
    pub city: String,

    #[validate(length(min = 1, message = "Address cannot be empty"))]
    pub address: String,

    #[validate(length(min = 1, message = "Region cannot be empty"))]
    pub region: String,

    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
}

/// Payment details. Monetary amounts are in minor currency units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Payment {
    #[validate(length(min = 1, message = "Transaction cannot be empty"))]
    pub transaction: String,

    pub request_id: String,

    #[validate(length(equal = 3, message = "Currency code must be 3 characters"))]
    pub currency: String,

    #[validate(length(min = 1, message = "Provider cannot be empty"))]
    pub provider: String,

    #[validate(range(min = 0, message = "Amount cannot be negative"))]
    pub amount: i64,

    /// Unix seconds
    #[validate(range(min = 1, message = "Payment timestamp must be positive"))]
    pub payment_dt: i64,

    #[validate(length(min = 1, message = "Bank cannot be empty"))]
    pub bank: String,

    #[validate(range(min = 0, message = "Delivery cost cannot be negative"))]
    pub delivery_cost: i64,

    #[validate(range(min = 0, message = "Goods total cannot be negative"))]
    pub goods_total: i64,

    #[validate(range(min = 0, message = "Custom fee cannot be negative"))]
    pub custom_fee: i64,
}

/// Line item of an order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Item {
    #[validate(range(min = 1, message = "Catalog ID must be positive"))]
    pub chrt_id: i64,

    #[validate(length(min = 1, message = "Track number cannot be empty"))]
    pub track_number: String,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,

    #[validate(length(min = 1, message = "RID cannot be empty"))]
    pub rid: String,

    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,

    /// Discount percentage
    #[validate(range(min = 0, max = 100, message = "Sale must be between 0 and 100"))]
    pub sale: i64,

    #[validate(length(max = 16, message = "Size cannot exceed 16 characters"))]
    pub size: String,

    #[validate(range(min = 0, message = "Total price cannot be negative"))]
    pub total_price: i64,

    #[validate(range(min = 1, message = "NM ID must be positive"))]
    pub nm_id: i64,

    #[validate(length(min = 1, message = "Brand cannot be empty"))]
    pub brand: String,

    #[validate(range(min = 0, message = "Status cannot be negative"))]
    pub status: i64,
}

/// `null` is treated like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_order;

    #[test]
    fn test_optional_fields_default_when_absent() {
        let mut json = serde_json::to_value(sample_order("opt-1")).unwrap();
        let obj = json.as_object_mut().unwrap();
        obj.remove("locale");
        obj.remove("sm_id");
        obj.remove("oof_shard");

        let order: Order = serde_json::from_value(json).unwrap();
        assert_eq!(order.order_uid, "opt-1");
        assert!(order.locale.is_empty());
        assert_eq!(order.sm_id, 0);
    }

    #[test]
    fn test_missing_fields_decode_to_zero_values() {
        let mut json = serde_json::to_value(sample_order("req-1")).unwrap();
        let obj = json.as_object_mut().unwrap();
        obj.remove("payment");
        obj.remove("customer_id");
        obj.insert("items".to_string(), serde_json::Value::Null);

        let order: Order = serde_json::from_value(json).unwrap();
        assert_eq!(order.payment, Payment::default());
        assert!(order.customer_id.is_empty());
        assert!(order.items.is_empty());

        let empty: Order = serde_json::from_slice(b"{}").unwrap();
        assert_eq!(empty, Order::default());
    }

    #[test]
    fn test_type_mismatch_fails_to_decode() {
        let mut json = serde_json::to_value(sample_order("req-2")).unwrap();
        json["payment"]["amount"] = serde_json::Value::String("lots".to_string());

        assert!(serde_json::from_value::<Order>(json).is_err());
        assert!(serde_json::from_slice::<Order>(b"[1, 2]").is_err());
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(sample_order("wire-1")).unwrap();
        assert_eq!(json["order_uid"], "wire-1");
        assert!(json["payment"]["payment_dt"].is_i64());
        assert!(json["items"][0]["chrt_id"].is_i64());
        assert!(json.get("shardkey").is_some());
    }
}
