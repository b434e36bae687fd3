//! Schema-level validation of decoded orders.
//!
//! Runs after a message decodes and before anything is persisted. The first
//! violated rule is reported; a failing order is dropped by the caller, never
//! retried.

use thiserror::Error;

use crate::types::{Delivery, Item, Order, OrderUid, Payment};

/// Maximum length of an email address (RFC 5321).
const MAX_EMAIL_LENGTH: usize = 254;

/// The rule a field violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rule {
    /// Field is absent or blank.
    #[error("is required")]
    Required,
    /// Field exceeds the maximum length.
    #[error("must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Numeric field is negative.
    #[error("must not be negative")]
    Negative,
    /// Numeric field is outside an inclusive range.
    #[error("must be between {min} and {max}")]
    OutOfRange {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
    /// Not an email address.
    #[error("must be an email address")]
    InvalidEmail,
    /// Not a three-letter currency code.
    #[error("must be a three-letter currency code")]
    InvalidCurrency,
    /// Leading or trailing whitespace.
    #[error("must not start or end with whitespace")]
    Untrimmed,
}

/// A decoded order failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {rule}")]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `items[0].price`.
    pub field: String,
    /// The violated rule.
    pub rule: Rule,
}

impl ValidationError {
    fn new(field: impl Into<String>, rule: Rule) -> Self {
        Self {
            field: field.into(),
            rule,
        }
    }
}

/// Validate an order, returning the first violated rule.
///
/// Orders without items are valid.
///
/// # Errors
///
/// Returns `ValidationError` naming the field and rule that failed.
pub fn validate(order: &Order) -> Result<(), ValidationError> {
    validate_uid(order.order_uid.as_str())?;
    required("track_number", &order.track_number)?;
    required("entry", &order.entry)?;
    validate_delivery(&order.delivery)?;
    validate_payment(&order.payment)?;
    for (index, item) in order.items.iter().enumerate() {
        validate_item(index, item)?;
    }
    required("locale", &order.locale)?;
    required("customer_id", &order.customer_id)?;
    required("delivery_service", &order.delivery_service)?;
    required("shardkey", &order.shardkey)?;
    non_negative("sm_id", i64::from(order.sm_id))?;
    if order.date_created.timestamp() == 0 {
        return Err(ValidationError::new("date_created", Rule::Required));
    }
    required("oof_shard", &order.oof_shard)?;
    Ok(())
}

/// Check an order uid on its own.
///
/// The same rule applies to decoded orders and to uids used for lookup, so
/// every uid that can be stored can also be looked up verbatim. Length is
/// counted in characters.
///
/// # Errors
///
/// Returns `ValidationError` for a blank, padded, or overlong uid.
pub fn validate_uid(uid: &str) -> Result<(), ValidationError> {
    if uid.trim().is_empty() {
        return Err(ValidationError::new("order_uid", Rule::Required));
    }
    if uid.trim() != uid {
        return Err(ValidationError::new("order_uid", Rule::Untrimmed));
    }
    if uid.chars().count() > OrderUid::MAX_LENGTH {
        return Err(ValidationError::new(
            "order_uid",
            Rule::TooLong {
                max: OrderUid::MAX_LENGTH,
            },
        ));
    }
    Ok(())
}

fn validate_delivery(delivery: &Delivery) -> Result<(), ValidationError> {
    required("delivery.name", &delivery.name)?;
    required("delivery.phone", &delivery.phone)?;
    required("delivery.zip", &delivery.zip)?;
    required("delivery.city", &delivery.city)?;
    required("delivery.address", &delivery.address)?;
    required("delivery.region", &delivery.region)?;
    required("delivery.email", &delivery.email)?;
    if !is_email(&delivery.email) {
        return Err(ValidationError::new("delivery.email", Rule::InvalidEmail));
    }
    Ok(())
}

fn validate_payment(payment: &Payment) -> Result<(), ValidationError> {
    required("payment.transaction", &payment.transaction)?;
    required("payment.currency", &payment.currency)?;
    if payment.currency.len() != 3 || !payment.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::new(
            "payment.currency",
            Rule::InvalidCurrency,
        ));
    }
    required("payment.provider", &payment.provider)?;
    non_negative("payment.amount", payment.amount)?;
    non_negative("payment.payment_dt", payment.payment_dt)?;
    required("payment.bank", &payment.bank)?;
    non_negative("payment.delivery_cost", payment.delivery_cost)?;
    non_negative("payment.goods_total", payment.goods_total)?;
    non_negative("payment.custom_fee", payment.custom_fee)?;
    Ok(())
}

fn validate_item(index: usize, item: &Item) -> Result<(), ValidationError> {
    let field = |name: &str| format!("items[{index}].{name}");

    non_negative(&field("chrt_id"), item.chrt_id)?;
    required(&field("track_number"), &item.track_number)?;
    non_negative(&field("price"), item.price)?;
    required(&field("rid"), &item.rid)?;
    required(&field("name"), &item.name)?;
    if !(0..=100).contains(&item.sale) {
        return Err(ValidationError::new(
            field("sale"),
            Rule::OutOfRange { min: 0, max: 100 },
        ));
    }
    required(&field("size"), &item.size)?;
    non_negative(&field("total_price"), item.total_price)?;
    non_negative(&field("nm_id"), item.nm_id)?;
    required(&field("brand"), &item.brand)?;
    non_negative(&field("status"), i64::from(item.status))?;
    Ok(())
}

fn required(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, Rule::Required));
    }
    Ok(())
}

fn non_negative(field: &str, value: i64) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::new(field, Rule::Negative));
    }
    Ok(())
}

/// Structural check: `local@domain`, both parts non-empty, one `@`.
fn is_email(value: &str) -> bool {
    if value.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    fn valid_item() -> Item {
        Item {
            chrt_id: 9_934_930,
            track_number: "WBILMTESTTRACK".to_owned(),
            price: 453,
            rid: "ab4219087a764ae0btest".to_owned(),
            name: "Mascaras".to_owned(),
            sale: 30,
            size: "0".to_owned(),
            total_price: 317,
            nm_id: 2_389_212,
            brand: "Vivienne Sabo".to_owned(),
            status: 202,
        }
    }

    fn valid_order() -> Order {
        Order {
            order_uid: OrderUid::new("b563feb7b2b84b6test"),
            track_number: "WBILMTESTTRACK".to_owned(),
            entry: "WBIL".to_owned(),
            delivery: Delivery {
                name: "Test Testov".to_owned(),
                phone: "+9720000000".to_owned(),
                zip: "2639809".to_owned(),
                city: "Kiryat Mozkin".to_owned(),
                address: "Ploshad Mira 15".to_owned(),
                region: "Kraiot".to_owned(),
                email: "test@gmail.com".to_owned(),
            },
            payment: Payment {
                transaction: "b563feb7b2b84b6test".to_owned(),
                request_id: String::new(),
                currency: "USD".to_owned(),
                provider: "wbpay".to_owned(),
                amount: 1817,
                payment_dt: 1_637_907_727,
                bank: "alpha".to_owned(),
                delivery_cost: 1500,
                goods_total: 317,
                custom_fee: 0,
            },
            items: vec![valid_item()],
            locale: "en".to_owned(),
            internal_signature: String::new(),
            customer_id: "test".to_owned(),
            delivery_service: "meest".to_owned(),
            shardkey: "9".to_owned(),
            sm_id: 99,
            date_created: Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).unwrap(),
            oof_shard: "1".to_owned(),
        }
    }

    fn field_of(order: &Order) -> String {
        validate(order).unwrap_err().field
    }

    #[test]
    fn test_valid_order_passes() {
        assert!(validate(&valid_order()).is_ok());
    }

    #[test]
    fn test_order_without_items_passes() {
        let mut order = valid_order();
        order.items.clear();
        assert!(validate(&order).is_ok());
    }

    #[test]
    fn test_empty_uid_rejected() {
        let mut order = valid_order();
        order.order_uid = OrderUid::new("");
        let err = validate(&order).unwrap_err();
        assert_eq!(err.field, "order_uid");
        assert_eq!(err.rule, Rule::Required);
        assert_eq!(err.to_string(), "order_uid is required");
    }

    #[test]
    fn test_long_uid_rejected() {
        let mut order = valid_order();
        order.order_uid = OrderUid::new("x".repeat(OrderUid::MAX_LENGTH + 1));
        assert!(matches!(
            validate(&order).unwrap_err().rule,
            Rule::TooLong { .. }
        ));
    }

    #[test]
    fn test_multibyte_uid_counts_characters() {
        let mut order = valid_order();
        // 128 characters, 256 bytes
        order.order_uid = OrderUid::new("я".repeat(OrderUid::MAX_LENGTH));
        assert!(validate(&order).is_ok());

        order.order_uid = OrderUid::new("я".repeat(OrderUid::MAX_LENGTH + 1));
        assert!(matches!(
            validate(&order).unwrap_err().rule,
            Rule::TooLong { .. }
        ));
    }

    #[test]
    fn test_padded_uid_rejected() {
        for padded in [" A1", "A1 ", "\tA1", "A1\n"] {
            let mut order = valid_order();
            order.order_uid = OrderUid::new(padded);
            let err = validate(&order).unwrap_err();
            assert_eq!(err.field, "order_uid", "{padded:?}");
            assert_eq!(err.rule, Rule::Untrimmed, "{padded:?}");
        }
    }

    #[test]
    fn test_inner_whitespace_allowed() {
        let mut order = valid_order();
        order.order_uid = OrderUid::new("A 1");
        assert!(validate(&order).is_ok());
    }

    #[test]
    fn test_validate_uid_standalone() {
        assert!(validate_uid("b563feb7b2b84b6test").is_ok());
        assert_eq!(validate_uid("  ").unwrap_err().rule, Rule::Required);
        assert_eq!(validate_uid(" A1").unwrap_err().rule, Rule::Untrimmed);
    }

    #[test]
    fn test_first_violation_wins() {
        let mut order = valid_order();
        order.track_number.clear();
        order.locale.clear();
        assert_eq!(field_of(&order), "track_number");
    }

    #[test]
    fn test_delivery_fields_required() {
        let mut order = valid_order();
        order.delivery.phone = "   ".to_owned();
        assert_eq!(field_of(&order), "delivery.phone");
    }

    #[test]
    fn test_delivery_email_format() {
        for bad in ["no-at-symbol", "@gmail.com", "test@", "a@b@c"] {
            let mut order = valid_order();
            order.delivery.email = bad.to_owned();
            let err = validate(&order).unwrap_err();
            assert_eq!(err.rule, Rule::InvalidEmail, "{bad}");
        }
    }

    #[test]
    fn test_payment_currency_format() {
        let mut order = valid_order();
        order.payment.currency = "US".to_owned();
        assert_eq!(validate(&order).unwrap_err().rule, Rule::InvalidCurrency);
    }

    #[test]
    fn test_negative_payment_amount_rejected() {
        let mut order = valid_order();
        order.payment.amount = -1;
        let err = validate(&order).unwrap_err();
        assert_eq!(err.field, "payment.amount");
        assert_eq!(err.rule, Rule::Negative);
    }

    #[test]
    fn test_negative_item_price_rejected() {
        let mut order = valid_order();
        order.items.push(Item {
            price: -100,
            ..valid_item()
        });
        assert_eq!(field_of(&order), "items[1].price");
    }

    #[test]
    fn test_negative_total_price_rejected() {
        let mut order = valid_order();
        order.items[0].total_price = -5;
        assert_eq!(field_of(&order), "items[0].total_price");
    }

    #[test]
    fn test_sale_out_of_range() {
        let mut order = valid_order();
        order.items[0].sale = 101;
        assert_eq!(
            validate(&order).unwrap_err().rule,
            Rule::OutOfRange { min: 0, max: 100 }
        );
    }

    #[test]
    fn test_unset_date_rejected() {
        let mut order = valid_order();
        order.date_created = DateTime::<Utc>::default();
        assert_eq!(field_of(&order), "date_created");
    }

    #[test]
    fn test_decoded_empty_object_fails_on_uid() {
        let order = Order::from_json(b"{}").unwrap();
        assert_eq!(field_of(&order), "order_uid");
    }
}
