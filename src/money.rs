use std::{fmt, iter::Sum, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A monetary amount held as whole cents
///
/// Stored records carry amounts as decimal text (`2.50`); parsing rounds to
/// the nearest cent so sums never drift the way floating point totals do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// The zero amount
    pub const ZERO: Self = Self(0);

    /// Build an amount from a number of cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Build an amount from whole dollars
    #[must_use]
    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// The amount in cents
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Whether the amount is strictly greater than zero
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Multiply by a whole count, saturating at the numeric bounds
    #[must_use]
    pub const fn times(self, count: i64) -> Self {
        Self(self.0.saturating_mul(count))
    }

    /// Saturating addition
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Convert to a floating point dollar value
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Round a floating point dollar value to the nearest cent
    ///
    /// Returns `None` for non-finite or out-of-range input.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64(dollars: f64) -> Option<Self> {
        let cents = (dollars * 100.0).round();
        if cents.is_finite() && cents.abs() < 9.0e15 {
            Some(Self(cents as i64))
        } else {
            None
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Error returned when an amount string is not a decimal number
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount '{0}'")]
pub struct ParseMoneyError(pub String);

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('$');
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(Self::from_f64)
            .ok_or_else(|| ParseMoneyError(s.to_string()))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let dollars = f64::deserialize(deserializer)?;
        Self::from_f64(dollars)
            .ok_or_else(|| serde::de::Error::custom(format!("amount out of range: {dollars}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("2.5".parse::<Money>(), Ok(Money::from_cents(250)));
        assert_eq!("10".parse::<Money>(), Ok(Money::from_dollars(10)));
        assert_eq!("$25.00".parse::<Money>(), Ok(Money::from_cents(2500)));
        assert_eq!(Money::from_cents(250).to_string(), "2.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("abc".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
        assert!("NaN".parse::<Money>().is_err());
    }

    #[test]
    fn test_sum_rounds_per_entry() {
        let total: Money = ["0.10", "0.20", "0.30"]
            .iter()
            .filter_map(|s| s.parse::<Money>().ok())
            .sum();
        assert_eq!(total, Money::from_cents(60));
    }

    #[test]
    fn test_json_roundtrip_as_number() {
        let json = serde_json::to_string(&Money::from_cents(1000)).unwrap_or_default();
        assert_eq!(json, "10.0");
        let back: Money = serde_json::from_str("10.25").unwrap_or_default();
        assert_eq!(back, Money::from_cents(1025));
    }
}
