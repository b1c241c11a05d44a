//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(10,2)` and carried as [`Decimal`] so cart
//! totals never accumulate floating point error. The storefront sells in a
//! single currency (USD).

use core::fmt;
use std::iter::Sum;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A non-negative amount in dollars, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rounding to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount.round_dp(2)))
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line total for `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|p| p.0).sum())
    }
}

// Accepts both `"29.99"` and `29.99` on the wire, rejecting negatives.
impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_to_cents() {
        let price = Price::new(Decimal::new(29_999, 3)).unwrap();
        assert_eq!(price.amount(), Decimal::new(3000, 2));
    }

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 2)),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_times_and_sum() {
        let vase = Price::from_cents(2999);
        let keychain = Price::from_cents(999);
        let total: Price = [vase.times(2), keychain.times(3)].into_iter().sum();
        assert_eq!(total, Price::from_cents(8995));
        assert_eq!(total.to_string(), "$89.95");
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let from_str: Price = serde_json::from_str("\"14.99\"").unwrap();
        let from_num: Price = serde_json::from_str("14.99").unwrap();
        assert_eq!(from_str, from_num);
        assert!(serde_json::from_str::<Price>("-3").is_err());
    }
}
