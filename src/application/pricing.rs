//! Fair-price engine.
//!
//! Derives vig-free probabilities for a market snapshot. Every estimate is
//! computed from scratch from the snapshot it is given.

use std::collections::BTreeMap;

use crate::domain::book::{MarketBookEntry, SelectionBook};
use crate::domain::fair::{DevigMethod, FairPriceEstimate, ReferenceSource};
use crate::domain::id::SelectionId;
use crate::domain::quote::Quote;

/// Computes [`FairPriceEstimate`]s.
#[derive(Debug, Clone)]
pub struct FairPriceEngine {
    min_reference_total: f64,
    max_reference_total: f64,
}

impl Default for FairPriceEngine {
    fn default() -> Self {
        Self::new(0.6, 2.0)
    }
}

impl FairPriceEngine {
    /// Reference prices whose implied total falls outside
    /// `[min_reference_total, max_reference_total]` are rejected as
    /// degenerate.
    #[must_use]
    pub const fn new(min_reference_total: f64, max_reference_total: f64) -> Self {
        Self {
            min_reference_total,
            max_reference_total,
        }
    }

    /// Fair probabilities for `entry`, or `None` when the market cannot be
    /// evaluated: fewer than two selections, a selection without a usable
    /// reference quote, or a degenerate reference.
    #[must_use]
    pub fn estimate(
        &self,
        entry: &MarketBookEntry,
        method: DevigMethod,
        reference: &ReferenceSource,
    ) -> Option<FairPriceEstimate> {
        if entry.selection_count() < 2 {
            return None;
        }
        let selections: Vec<&SelectionId> = entry.selections().map(|(id, _)| id).collect();
        let probabilities = match reference {
            ReferenceSource::BestPrice => {
                let prices = reference_prices(entry, SelectionBook::best)?;
                self.devig(method, &prices)?
            }
            ReferenceSource::Sharp(book) => {
                let prices = reference_prices(entry, |s| s.from_book(book))?;
                self.devig(method, &prices)?
            }
            ReferenceSource::Consensus => self.consensus(entry, method)?,
        };

        Some(FairPriceEstimate {
            market: entry.market().clone(),
            method,
            reference: reference.clone(),
            book_version: entry.version(),
            probabilities: selections
                .into_iter()
                .cloned()
                .zip(probabilities)
                .collect::<BTreeMap<_, _>>(),
        })
    }

    /// One estimate per configured method; methods that cannot evaluate are
    /// skipped.
    #[must_use]
    pub fn estimate_all(
        &self,
        entry: &MarketBookEntry,
        methods: &[DevigMethod],
        reference: &ReferenceSource,
    ) -> Vec<FairPriceEstimate> {
        methods
            .iter()
            .filter_map(|m| self.estimate(entry, *m, reference))
            .collect()
    }

    fn devig(&self, method: DevigMethod, prices: &[f64]) -> Option<Vec<f64>> {
        let total: f64 = prices.iter().map(|p| 1.0 / p).sum();
        if !(self.min_reference_total..=self.max_reference_total).contains(&total) {
            return None;
        }
        method.devig(prices)
    }

    /// Devig every book that quotes the full market, average per selection
    /// and renormalize.
    fn consensus(&self, entry: &MarketBookEntry, method: DevigMethod) -> Option<Vec<f64>> {
        let books = entry.books_quoting_all();
        let mut sums = vec![0.0; entry.selection_count()];
        let mut used = 0usize;
        for book in &books {
            let Some(prices) = reference_prices(entry, |s| s.from_book(book)) else {
                continue;
            };
            let Some(probabilities) = self.devig(method, &prices) else {
                continue;
            };
            for (sum, p) in sums.iter_mut().zip(probabilities) {
                *sum += p;
            }
            used += 1;
        }
        if used == 0 {
            return None;
        }
        let total: f64 = sums.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return None;
        }
        Some(sums.into_iter().map(|s| s / total).collect())
    }
}

/// One reference price per selection in selection order, or `None` if any
/// selection lacks one.
fn reference_prices<'a, F>(entry: &'a MarketBookEntry, pick: F) -> Option<Vec<f64>>
where
    F: Fn(&'a SelectionBook) -> Option<&'a Quote>,
{
    entry
        .selections()
        .map(|(_, selection)| pick(selection).map(|q| q.odds.as_f64()))
        .collect()
}
