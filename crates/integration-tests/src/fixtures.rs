//! Valid orders and message payloads.

use chrono::{TimeZone, Utc};
use order_service_core::{Delivery, Item, Order, OrderUid, Payment};

/// A valid item with the given chart id and price.
#[must_use]
pub fn item(chrt_id: i64, price: i64) -> Item {
    Item {
        chrt_id,
        track_number: "WBILMTESTTRACK".to_string(),
        price,
        rid: format!("rid-{chrt_id}"),
        name: "Mascaras".to_string(),
        sale: 30,
        size: "0".to_string(),
        total_price: price,
        nm_id: 2_389_212,
        brand: "Vivienne Sabo".to_string(),
        status: 202,
    }
}

/// A valid order with the given uid and items.
#[must_use]
pub fn order_with_items(uid: &str, items: Vec<Item>) -> Order {
    Order {
        order_uid: OrderUid::new(uid),
        track_number: "WBILMTESTTRACK".to_string(),
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
            transaction: uid.to_string(),
            request_id: String::new(),
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: 1817,
            payment_dt: 1_637_907_727,
            bank: "alpha".to_string(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items,
        locale: "en".to_string(),
        internal_signature: String::new(),
        customer_id: "test".to_string(),
        delivery_service: "meest".to_string(),
        shardkey: "9".to_string(),
        sm_id: 99,
        date_created: Utc
            .with_ymd_and_hms(2021, 11, 26, 6, 22, 19)
            .single()
            .unwrap_or_default(),
        oof_shard: "1".to_string(),
    }
}

/// A valid order with one item.
#[must_use]
pub fn order(uid: &str) -> Order {
    order_with_items(uid, vec![item(9_934_930, 453)])
}

/// JSON message body for `order`.
///
/// # Panics
///
/// Panics if the order cannot be serialized.
#[must_use]
#[allow(clippy::expect_used)]
pub fn payload(order: &Order) -> Vec<u8> {
    serde_json::to_vec(order).expect("order serializes")
}
