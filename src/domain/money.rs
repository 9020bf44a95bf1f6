//! Price representation for sportsbook quotes.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Decimal odds, always strictly greater than 1.
///
/// A winning stake of 1 returns `odds` in total (stake included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Odds(Decimal);

impl Odds {
    /// Validate and wrap decimal odds.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OddsOutOfRange`] when `value <= 1`.
    pub fn try_new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ONE {
            return Err(DomainError::OddsOutOfRange { odds: value });
        }
        Ok(Self(value))
    }

    /// Convert American (moneyline) odds to decimal odds.
    ///
    /// `+150` becomes 2.5 and `-200` becomes 1.5. Values strictly between
    /// -100 and +100 are not valid American prices and yield `None`.
    #[must_use]
    pub fn from_american(american: Decimal) -> Option<Self> {
        let hundred = Decimal::ONE_HUNDRED;
        let decimal = if american >= hundred {
            Decimal::ONE + american / hundred
        } else if american <= -hundred {
            Decimal::ONE + hundred / american.abs()
        } else {
            return None;
        };
        Self::try_new(decimal).ok()
    }

    /// The raw decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Implied probability `1 / odds`, vig included.
    #[must_use]
    pub fn implied_probability(&self) -> Decimal {
        Decimal::ONE / self.0
    }

    /// The odds as a float for probability math.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }
}

impl TryFrom<Decimal> for Odds {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Odds> for Decimal {
    fn from(odds: Odds) -> Self {
        odds.0
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_even_or_lower() {
        assert!(Odds::try_new(dec!(1.0)).is_err());
        assert!(Odds::try_new(dec!(0.5)).is_err());
        assert!(Odds::try_new(dec!(-2)).is_err());
        assert!(Odds::try_new(dec!(1.01)).is_ok());
    }

    #[test]
    fn converts_american_prices() {
        assert_eq!(Odds::from_american(dec!(150)).map(|o| o.value()), Some(dec!(2.5)));
        assert_eq!(Odds::from_american(dec!(-200)).map(|o| o.value()), Some(dec!(1.5)));
        assert_eq!(Odds::from_american(dec!(100)).map(|o| o.value()), Some(dec!(2)));
        assert_eq!(Odds::from_american(dec!(50)), None);
    }

    #[test]
    fn implied_probability_is_reciprocal() {
        let odds = Odds::try_new(dec!(2.5)).unwrap();
        assert_eq!(odds.implied_probability(), dec!(0.4));
    }
}
