//! Order identifier type.

use core::borrow::Borrow;
use core::fmt;

use serde::{Deserialize, Serialize};

/// Globally unique order identifier.
///
/// The identifier is the only lookup key for orders, both in the durable
/// store and in the in-memory cache. It is an opaque string assigned by the
/// upstream producer; emptiness and length are checked by
/// [`validate`](crate::validate), not on construction, so that a decoded
/// message with a blank identifier can still be reported by its rule.
///
/// `OrderUid` implements `Borrow<str>`, so maps keyed by it can be queried
/// with a plain `&str`:
///
/// ```
/// use std::collections::HashMap;
/// use order_service_core::OrderUid;
///
/// let mut map = HashMap::new();
/// map.insert(OrderUid::new("b563feb7b2b84b6test"), 1);
/// assert_eq!(map.get("b563feb7b2b84b6test"), Some(&1));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct OrderUid(String);

impl OrderUid {
    /// Maximum accepted identifier length.
    pub const MAX_LENGTH: usize = 128;

    /// Wrap an identifier string.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is blank (empty or whitespace only).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderUid {
    fn from(uid: String) -> Self {
        Self(uid)
    }
}

impl From<&str> for OrderUid {
    fn from(uid: &str) -> Self {
        Self(uid.to_owned())
    }
}

impl AsRef<str> for OrderUid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for OrderUid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderUid {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderUid {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderUid {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
