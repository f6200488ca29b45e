use chrono::Utc;
use uuid::Uuid;

use crate::models::{Delivery, Item, Order, Payment};

/// Build an order that passes [`RuleValidator`](crate::validation::RuleValidator).
///
/// Used by tests across the workspace and by the load generator.
pub fn sample_order(order_uid: &str) -> Order {
    let track_number = format!("TRK{}", &Uuid::new_v4().simple().to_string()[..8]).to_uppercase();

    Order {
        order_uid: order_uid.to_string(),
        track_number: track_number.clone(),
        entry: "WBIL".to_string(),
        delivery: Delivery {
            name: "Test Testov".to_string(),
            phone: "+9720000000".to_string(),
            zip: "2639809".to_string(),
            city: "Kiryat Mozkin".to_string(),
            address: "Ploshad Mira 15".to_string(),
            region: "Kraiot".to_string(),
            email: "test@gmail.com".to_string(),
        },
        payment: Payment {
            transaction: order_uid.to_string(),
            request_id: String::new(),
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: 650,
            payment_dt: Utc::now().timestamp(),
            bank: "alpha".to_string(),
            delivery_cost: 200,
            goods_total: 450,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9934930,
            track_number,
            price: 500,
            rid: Uuid::new_v4().simple().to_string(),
            name: "Mascaras".to_string(),
            sale: 10,
            size: "0".to_string(),
            total_price: 450,
            nm_id: 2389212,
            brand: "Vivienne Sabo".to_string(),
            status: 202,
        }],
        locale: "en".to_string(),
        internal_signature: String::new(),
        customer_id: "test".to_string(),
        delivery_service: "meest".to_string(),
        shardkey: "9".to_string(),
        sm_id: 99,
        date_created: Utc::now().to_rfc3339(),
        oof_shard: "1".to_string(),
    }
}
