//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are non-negative amounts in the shop's single currency with at most
//! two decimal places and at most [`Price::MAX`], which fits the
//! `NUMERIC(12, 2)` price columns. Cart subtotals are also `Price`s, so the
//! same bounds cover them.

use core::fmt;
use core::iter::Sum;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum number of decimal places a price may carry.
const MAX_SCALE: u32 = 2;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// The amount has more than two decimal places.
    #[error("price must have at most {max} decimal places (got {value})")]
    TooPrecise {
        /// Maximum allowed decimal places.
        max: u32,
        /// The rejected amount.
        value: Decimal,
    },
    /// The amount exceeds [`Price::MAX`].
    #[error("price cannot exceed {max} (got {value})")]
    TooLarge {
        /// Largest allowed amount.
        max: Decimal,
        /// The rejected amount.
        value: Decimal,
    },
}

/// A non-negative monetary amount.
///
/// ## Examples
///
/// ```
/// use bazaar_core::Price;
/// use rust_decimal::Decimal;
///
/// let ten = Price::new(Decimal::new(1000, 2)).unwrap();
/// let five = Price::new(Decimal::new(5, 0)).unwrap();
/// assert_eq!(ten.checked_add(five).unwrap().amount(), Decimal::new(15, 0));
///
/// assert!(Price::new(Decimal::new(-1, 0)).is_err());
/// assert!(Price::new(Decimal::new(1999, 3)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// A price of zero, the subtotal of an empty cart.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest representable price, 9,999,999,999.99.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, MAX_SCALE));

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has more than two
    /// decimal places (trailing zeros are ignored), or exceeds [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }

        if amount.normalize().scale() > MAX_SCALE {
            return Err(PriceError::TooPrecise {
                max: MAX_SCALE,
                value: amount,
            });
        }

        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge {
                max: Self::MAX.0,
                value: amount,
            });
        }

        Ok(Self(amount.abs()))
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), MAX_SCALE))
    }

    /// Get the decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Add two prices, returning `None` if the sum exceeds [`Price::MAX`].
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0
            .checked_add(other.0)
            .filter(|sum| *sum <= Self::MAX.0)
            .map(Self)
    }

    /// Subtract `other`, returning `None` if the result would be negative.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        let diff = self.0.checked_sub(other.0)?;
        if diff.is_sign_negative() && !diff.is_zero() {
            return None;
        }
        Some(Self(diff.abs()))
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl<'a> Sum<&'a Self> for Price {
    /// Sums prices, saturating at [`Price::MAX`] rather than panicking.
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, p| acc.checked_add(*p).unwrap_or(Self::MAX))
    }
}

#[cfg(feature = "postgres")]
impl ::sqlx::Type<::sqlx::Postgres> for Price {
    fn type_info() -> ::sqlx::postgres::PgTypeInfo {
        <Decimal as ::sqlx::Type<::sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for Price {
    fn decode(
        value: ::sqlx::postgres::PgValueRef<'r>,
    ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
        let amount = <Decimal as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl ::sqlx::Encode<'_, ::sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut ::sqlx::postgres::PgArgumentBuffer,
    ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
        <Decimal as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_zero_and_positive() {
        assert_eq!(Price::new(Decimal::ZERO).unwrap(), Price::ZERO);
        assert_eq!(
            Price::new(Decimal::new(1999, 2)).unwrap().amount(),
            Decimal::new(1999, 2)
        );
    }

    #[test]
    fn test_new_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 2)),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_new_ignores_trailing_zeros() {
        assert!(Price::new(Decimal::new(10_000, 4)).is_ok());
        assert!(matches!(
            Price::new(Decimal::new(10_001, 4)),
            Err(PriceError::TooPrecise { max: 2, .. })
        ));
    }

    #[test]
    fn test_new_rejects_above_max() {
        assert_eq!(
            Price::new(Decimal::new(999_999_999_999, 2)).unwrap(),
            Price::MAX
        );
        assert!(matches!(
            Price::new(Decimal::new(99_999_999_999, 0)),
            Err(PriceError::TooLarge { .. })
        ));
        assert!(serde_json::from_str::<Price>("\"10000000000\"").is_err());
    }

    #[test]
    fn test_checked_add_stops_at_max() {
        let one_cent = Price::from_cents(1);
        assert_eq!(Price::MAX.checked_add(one_cent), None);
        assert_eq!(Price::MAX.checked_add(Price::ZERO), Some(Price::MAX));
        assert_eq!([Price::MAX, one_cent].iter().sum::<Price>(), Price::MAX);
    }

    #[test]
    fn test_checked_sub_never_goes_negative() {
        let five = Price::from_cents(500);
        let ten = Price::from_cents(1000);
        assert_eq!(ten.checked_sub(five), Some(five));
        assert_eq!(five.checked_sub(five), Some(Price::ZERO));
        assert_eq!(five.checked_sub(ten), None);
    }

    #[test]
    fn test_sum() {
        let prices = [
            Price::from_cents(1000),
            Price::from_cents(550),
            Price::from_cents(1),
        ];
        let total: Price = prices.iter().sum();
        assert_eq!(total, Price::from_cents(1551));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(500).to_string(), "5.00");
        assert_eq!(Price::new(Decimal::new(5, 0)).unwrap().to_string(), "5.00");
    }

    #[test]
    fn test_serde() {
        let price: Price = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(price, Price::from_cents(1250));

        let price: Price = serde_json::from_str("3").unwrap();
        assert_eq!(price, Price::from_cents(300));

        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
    }
}
