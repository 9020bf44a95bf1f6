//! Vig-free probability estimates and the devig methods that produce them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::{MarketId, SelectionId, SportsbookId};

/// How the bookmaker margin is removed from implied probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevigMethod {
    /// Scale every implied probability by the same factor.
    Multiplicative,
    /// Raise every implied probability to a common exponent `k`.
    ///
    /// Removes proportionally more margin from long shots than from favourites.
    Power,
}

impl DevigMethod {
    /// Convert decimal prices for every selection of a market into fair
    /// probabilities summing to 1.
    ///
    /// Returns `None` for fewer than two prices or any price that is not a
    /// finite number above 1.
    #[must_use]
    pub fn devig(self, prices: &[f64]) -> Option<Vec<f64>> {
        if prices.len() < 2 || prices.iter().any(|p| !p.is_finite() || *p <= 1.0) {
            return None;
        }
        let implied: Vec<f64> = prices.iter().map(|p| 1.0 / p).collect();
        let raw = match self {
            Self::Multiplicative => implied,
            Self::Power => {
                let k = solve_power_exponent(&implied)?;
                implied.iter().map(|q| q.powf(k)).collect()
            }
        };
        normalize(raw)
    }
}

const POWER_TOLERANCE: f64 = 1e-12;
const POWER_MAX_ITERATIONS: usize = 200;

/// Find `k > 0` with `sum(q_i^k) == 1` by bisection.
///
/// Every `q_i` is in `(0, 1)` and there are at least two of them, so the sum
/// is strictly decreasing in `k`, exceeds 1 at `k = 0` and tends to 0.
fn solve_power_exponent(implied: &[f64]) -> Option<f64> {
    let total = |k: f64| implied.iter().map(|q| q.powf(k)).sum::<f64>();

    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    while total(hi) > 1.0 {
        lo = hi;
        hi *= 2.0;
        if hi > 1e6 {
            return None;
        }
    }
    for _ in 0..POWER_MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let value = total(mid) - 1.0;
        if value.abs() < POWER_TOLERANCE {
            return Some(mid);
        }
        if value > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some((lo + hi) / 2.0)
}

fn normalize(raw: Vec<f64>) -> Option<Vec<f64>> {
    let sum: f64 = raw.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    Some(raw.into_iter().map(|p| p / sum).collect())
}

/// Which quotes feed the fair-price calculation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    /// Best available price per selection across all books.
    BestPrice,
    /// Devig each book that quotes the full market, then average.
    Consensus,
    /// A single designated book.
    Sharp(SportsbookId),
}

impl std::fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BestPrice => write!(f, "best_price"),
            Self::Consensus => write!(f, "consensus"),
            Self::Sharp(book) => write!(f, "sharp:{book}"),
        }
    }
}

/// Fair probability per selection for one market at one book version.
#[derive(Debug, Clone, PartialEq)]
pub struct FairPriceEstimate {
    pub market: MarketId,
    pub method: DevigMethod,
    pub reference: ReferenceSource,
    /// Version of the market book this was computed from.
    pub book_version: u64,
    pub probabilities: BTreeMap<SelectionId, f64>,
}

impl FairPriceEstimate {
    #[must_use]
    pub fn probability(&self, selection: &SelectionId) -> Option<f64> {
        self.probabilities.get(selection).copied()
    }

    /// Fair decimal odds `1 / p`.
    #[must_use]
    pub fn fair_odds(&self, selection: &SelectionId) -> Option<f64> {
        self.probability(selection).filter(|p| *p > 0.0).map(|p| 1.0 / p)
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.probabilities.values().sum()
    }
}
