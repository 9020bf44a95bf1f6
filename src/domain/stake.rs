//! Stake splitting for arbitrage legs.

use rust_decimal::Decimal;
use serde::Serialize;

use super::money::Odds;

/// Per-leg stake fractions that pay out the same amount whichever leg wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakeAllocation {
    /// Fraction of the total stake per leg, in input order. Sums to 1.
    pub fractions: Vec<Decimal>,
    /// Sum of implied probabilities `sum(1 / price)`.
    pub implied_total: Decimal,
    /// Return on total stake if any leg wins: `1 / implied_total - 1`.
    pub guaranteed_return: Decimal,
}

impl StakeAllocation {
    /// Split prices into stake fractions `(1/p_i) / sum(1/p_j)`.
    ///
    /// Returns `None` for fewer than two legs or when the implied total is
    /// not below 1 (no guaranteed profit exists).
    #[must_use]
    pub fn allocate(prices: &[Odds]) -> Option<Self> {
        if prices.len() < 2 {
            return None;
        }
        let implied: Vec<Decimal> = prices.iter().map(Odds::implied_probability).collect();
        let implied_total: Decimal = implied.iter().copied().sum();
        if implied_total >= Decimal::ONE || implied_total <= Decimal::ZERO {
            return None;
        }
        let fractions = implied.iter().map(|p| *p / implied_total).collect();
        Some(Self {
            fractions,
            implied_total,
            guaranteed_return: Decimal::ONE / implied_total - Decimal::ONE,
        })
    }

    /// Absolute stakes for a total bankroll commitment.
    #[must_use]
    pub fn stakes_for(&self, total: Decimal) -> Vec<Decimal> {
        self.fractions.iter().map(|f| *f * total).collect()
    }

    /// Payout received whichever leg wins.
    #[must_use]
    pub fn payout_for(&self, total: Decimal) -> Decimal {
        total / self.implied_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn odds(v: Decimal) -> Odds {
        Odds::try_new(v).unwrap()
    }

    #[test]
    fn even_split_for_symmetric_prices() {
        let alloc = StakeAllocation::allocate(&[odds(dec!(2.50)), odds(dec!(2.50))]).unwrap();
        assert_eq!(alloc.fractions, vec![dec!(0.5), dec!(0.5)]);
        assert_eq!(alloc.implied_total, dec!(0.8));
        assert_eq!(alloc.guaranteed_return, dec!(0.25));
    }

    #[test]
    fn every_leg_pays_the_same() {
        let prices = [odds(dec!(2.20)), odds(dec!(3.90)), odds(dec!(4.50))];
        let alloc = StakeAllocation::allocate(&prices).unwrap();
        let stakes = alloc.stakes_for(dec!(100));
        let payouts: Vec<Decimal> = stakes
            .iter()
            .zip(&prices)
            .map(|(s, p)| (*s * p.value()).round_dp(6))
            .collect();
        assert!(payouts.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(payouts[0], alloc.payout_for(dec!(100)).round_dp(6));
    }

    #[test]
    fn no_allocation_without_arbitrage() {
        let prices = [odds(dec!(2.10)), odds(dec!(2.10)), odds(dec!(2.10))];
        assert!(StakeAllocation::allocate(&prices).is_none());
        assert!(StakeAllocation::allocate(&[odds(dec!(2)), odds(dec!(2))]).is_none());
        assert!(StakeAllocation::allocate(&[odds(dec!(5))]).is_none());
    }
}
