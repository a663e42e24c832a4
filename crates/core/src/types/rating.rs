//! Rating value type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned for an out-of-range rating value.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct RatingValueError(pub i16);

/// A star rating between 1 and 5 inclusive.
///
/// Construction is validated, so every `RatingValue` in the system is in
/// range; the database additionally enforces the range with a CHECK
/// constraint.
///
/// ## Examples
///
/// ```
/// use rately_core::RatingValue;
///
/// let value = RatingValue::new(4).unwrap();
/// assert_eq!(value.as_i16(), 4);
///
/// assert!(RatingValue::new(0).is_err());
/// assert!(RatingValue::new(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct RatingValue(i16);

impl RatingValue {
    /// The minimum allowed rating.
    pub const MIN: i16 = 1;
    /// The maximum allowed rating.
    pub const MAX: i16 = 5;

    /// Create a rating value, rejecting anything outside 1..=5.
    ///
    /// # Errors
    ///
    /// Returns [`RatingValueError`] if `value` is out of range.
    pub const fn new(value: i16) -> Result<Self, RatingValueError> {
        if value >= Self::MIN && value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(RatingValueError(value))
        }
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn as_i16(&self) -> i16 {
        self.0
    }

    /// Zero-based index into a five-slot breakdown table.
    #[must_use]
    pub const fn index(&self) -> usize {
        (self.0 - 1) as usize
    }
}

impl TryFrom<i16> for RatingValue {
    type Error = RatingValueError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RatingValue> for i16 {
    fn from(value: RatingValue) -> Self {
        value.0
    }
}

impl fmt::Display for RatingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// SQLx support (with postgres feature). Stored as SMALLINT.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for RatingValue {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for RatingValue {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(raw)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for RatingValue {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
