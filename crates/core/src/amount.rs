//! Amount - Non-negative decimal wrapper for escrow amounts
//!
//! All monetary values in FundLock are expressed in minor currency units
//! (cents). Amounts MUST be non-negative; this is enforced at the type level.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when working with amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),
}

/// A non-negative amount in minor currency units.
///
/// # Invariant
/// The inner value is always >= 0. This is enforced by the constructor.
///
/// # Example
/// ```
/// use fundlock_core::Amount;
/// use rust_decimal::Decimal;
///
/// let amount = Amount::new(Decimal::new(9_200, 0)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(9_200, 0));
///
/// // Negative amounts are rejected
/// let negative = Amount::new(Decimal::new(-100, 0));
/// assert!(negative.is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Zero amount constant
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Amount from a Decimal.
    ///
    /// Returns an error if the value is negative.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            Err(AmountError::NegativeAmount(value))
        } else {
            Ok(Self(value))
        }
    }

    /// Create an Amount from a whole number of minor units.
    pub fn from_minor(units: i64) -> Result<Self, AmountError> {
        Self::new(Decimal::new(units, 0))
    }

    /// Create an Amount without validation.
    ///
    /// # Safety
    /// The caller MUST ensure the value is non-negative.
    /// Use only for trusted sources (e.g., deserialization from validated storage).
    #[inline]
    pub const fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// Get the inner Decimal value
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Check if the amount is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition - returns None on overflow
    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction - returns None if the result would be negative
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        let result = self.0.checked_sub(other.0)?;
        if result < Decimal::ZERO {
            None
        } else {
            Some(Amount(result))
        }
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        self.checked_sub(other).unwrap_or(Amount::ZERO)
    }

    /// Take `percentage` (0-100) of this amount, rounded to whole minor units.
    ///
    /// Rounding is half-away-from-zero, matching how payout amounts are
    /// rounded across the platform.
    pub fn percentage(&self, percentage: Decimal) -> Amount {
        let scaled = self.0 * percentage / Decimal::ONE_HUNDRED;
        Amount(scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Round to whole minor units, half away from zero.
    pub fn round_minor(&self) -> Amount {
        Amount(self.0.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Sum an iterator of amounts. Saturates at Decimal::MAX on overflow.
    pub fn sum<'a, I: IntoIterator<Item = &'a Amount>>(amounts: I) -> Amount {
        amounts
            .into_iter()
            .fold(Amount::ZERO, |acc, a| acc.checked_add(a).unwrap_or(Amount(Decimal::MAX)))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::from_minor(9_200).unwrap();
        assert_eq!(amount.value(), dec!(9200));
    }

    #[test]
    fn test_amount_negative_rejected() {
        let result = Amount::new(dec!(-100));
        assert!(matches!(result, Err(AmountError::NegativeAmount(_))));
    }

    #[test]
    fn test_checked_sub_prevents_negative() {
        let a = Amount::from_minor(50).unwrap();
        let b = Amount::from_minor(100).unwrap();
        assert!(a.checked_sub(&b).is_none());
        assert_eq!(a.saturating_sub(&b), Amount::ZERO);
    }

    #[test]
    fn test_percentage_rounds_half_away_from_zero() {
        let raised = Amount::from_minor(9_200).unwrap();
        assert_eq!(raised.percentage(dec!(40)).value(), dec!(3680));

        // 125 * 50% = 62.5 -> rounds to 63, not 62
        let odd = Amount::from_minor(125).unwrap();
        assert_eq!(odd.percentage(dec!(50)).value(), dec!(63));
    }

    #[test]
    fn test_sum() {
        let amounts = [
            Amount::from_minor(3_680).unwrap(),
            Amount::from_minor(1_840).unwrap(),
        ];
        assert_eq!(Amount::sum(&amounts).value(), dec!(5520));
    }

    #[test]
    fn test_serde_through_decimal() {
        let amount = Amount::from_minor(4_600).unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);

        let negative: Result<Amount, _> = serde_json::from_str("\"-1\"");
        assert!(negative.is_err());
    }
}
