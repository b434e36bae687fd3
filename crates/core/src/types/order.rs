//! The `Order` aggregate.
//!
//! Field names match the JSON published on the orders topic, so the same
//! types decode broker messages and serialize HTTP responses.
//!
//! Every struct is `#[serde(default)]`: an absent field decodes to its empty
//! value and is then rejected by [`validate`](crate::validate) with a named
//! rule, rather than failing the whole decode. A missing `items` array
//! becomes `[]`, and `items` is always serialized as an array.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::uid::OrderUid;

/// An order with its embedded delivery and payment records and its items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub order_uid: OrderUid,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i32,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

/// Recipient and address. Stored as a JSON blob alongside the order row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Payment transaction. Amounts are integers in minor currency units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    /// Unix timestamp (seconds) of the payment.
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

/// A line item. Belongs to exactly one order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    /// Discount percentage, 0-100.
    pub sale: i32,
    pub size: String,
    /// Price after discount.
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    /// Fulfillment status code.
    pub status: i32,
}

impl Order {
    /// Decode an order from a raw message body.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the body is not a JSON object of the
    /// expected shape (malformed JSON or a field of the wrong type).
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
