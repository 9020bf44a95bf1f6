//! Opportunity detection and de-duplication.
//!
//! [`OpportunityDetector`] is stateless: it looks at one snapshot and lists
//! what holds in it. [`OpportunityLedger`] remembers what was emitted per
//! market and turns successive detections into emit, supersede and withdraw
//! events.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::book::{MarketBookEntry, SelectionBook};
use crate::domain::fair::FairPriceEstimate;
use crate::domain::id::MarketId;
use crate::domain::opportunity::{Leg, Opportunity, OpportunityKey};
use crate::domain::stake::StakeAllocation;
use crate::port::outbound::notifier::WithdrawnEvent;

/// Detection thresholds.
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// Minimum `price * fair_probability - 1` for an EV opportunity.
    pub ev_threshold: f64,
    /// Arbitrage requires `sum(1 / best) < 1 - arb_safety_margin`.
    pub arb_safety_margin: Decimal,
    /// Edge movement that counts as a material change.
    pub edge_tolerance: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            ev_threshold: 0.03,
            arb_safety_margin: Decimal::new(5, 3),
            edge_tolerance: 0.001,
        }
    }
}

/// Finds EV and arbitrage opportunities in a single snapshot.
#[derive(Debug, Clone, Default)]
pub struct OpportunityDetector {
    settings: DetectorSettings,
}

impl OpportunityDetector {
    #[must_use]
    pub const fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Everything that holds in `entry`. `fair` is ignored unless it was
    /// computed from this exact snapshot.
    #[must_use]
    pub fn evaluate(
        &self,
        entry: &MarketBookEntry,
        fair: Option<&FairPriceEstimate>,
    ) -> Vec<Opportunity> {
        let mut found = fair
            .filter(|f| f.book_version == entry.version() && &f.market == entry.market())
            .map(|f| self.detect_ev(entry, f))
            .unwrap_or_default();
        found.extend(self.detect_arbitrage(entry));
        found
    }

    /// Every open quote whose EV against `fair` exceeds the threshold.
    #[must_use]
    pub fn detect_ev(&self, entry: &MarketBookEntry, fair: &FairPriceEstimate) -> Vec<Opportunity> {
        let mut found = Vec::new();
        for (selection_id, selection) in entry.selections() {
            let Some(probability) = fair.probability(selection_id) else {
                continue;
            };
            for quote in selection.open_quotes() {
                let ev = quote.odds.as_f64() * probability - 1.0;
                if ev > self.settings.ev_threshold {
                    found.push(Opportunity::ev(
                        entry.market().clone(),
                        Leg {
                            sportsbook: quote.sportsbook.clone(),
                            selection: quote.selection.clone(),
                            odds: quote.odds,
                        },
                        probability,
                        ev,
                        entry.version(),
                    ));
                }
            }
        }
        found
    }

    /// Arbitrage across the best price of every selection, if one exists.
    #[must_use]
    pub fn detect_arbitrage(&self, entry: &MarketBookEntry) -> Option<Opportunity> {
        if entry.selection_count() < 2 || !entry.is_complete() {
            return None;
        }
        let legs: Vec<Leg> = entry
            .selections()
            .map(|(_, selection)| {
                SelectionBook::best(selection).map(|q| Leg {
                    sportsbook: q.sportsbook.clone(),
                    selection: q.selection.clone(),
                    odds: q.odds,
                })
            })
            .collect::<Option<_>>()?;

        let prices: Vec<_> = legs.iter().map(|l| l.odds).collect();
        let allocation = StakeAllocation::allocate(&prices)?;
        if allocation.implied_total >= Decimal::ONE - self.settings.arb_safety_margin {
            return None;
        }
        let edge = (Decimal::ONE - allocation.implied_total).to_f64()?;
        Opportunity::arbitrage(entry.market().clone(), legs, edge, allocation, entry.version()).ok()
    }
}

/// Outcome of reconciling a detection pass against earlier emissions.
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    /// New, or a material update of an earlier emission (see
    /// [`Opportunity::supersedes`]).
    Emitted(Opportunity),
    Withdrawn(WithdrawnEvent),
}

#[derive(Debug, Default)]
struct MarketLedger {
    last_version: Option<u64>,
    active: HashMap<OpportunityKey, Opportunity>,
}

/// Remembers the opportunities emitted for each market.
///
/// Owned by a single worker; markets are sharded so one ledger sees every
/// snapshot of the markets it owns.
#[derive(Debug)]
pub struct OpportunityLedger {
    edge_tolerance: f64,
    markets: HashMap<MarketId, MarketLedger>,
}

impl OpportunityLedger {
    #[must_use]
    pub fn new(edge_tolerance: f64) -> Self {
        Self {
            edge_tolerance,
            markets: HashMap::new(),
        }
    }

    /// Reconcile the opportunities found at `version` of `market`.
    ///
    /// Snapshots at or below the last reconciled version produce nothing, so
    /// an opportunity is never emitted twice for one book version.
    pub fn reconcile(
        &mut self,
        market: &MarketId,
        version: u64,
        found: Vec<Opportunity>,
    ) -> Vec<LedgerEvent> {
        let tolerance = self.edge_tolerance;
        let ledger = self.markets.entry(market.clone()).or_default();
        if ledger.last_version.is_some_and(|v| version <= v) {
            return Vec::new();
        }
        ledger.last_version = Some(version);

        let mut events = Vec::new();
        let mut still_holding = HashMap::with_capacity(found.len());
        for opportunity in found {
            let key = opportunity.key();
            match ledger.active.remove(&key) {
                Some(previous) if !is_material(&previous, &opportunity, tolerance) => {
                    still_holding.insert(key, previous);
                }
                Some(previous) => {
                    let replacement = opportunity.superseding(previous.id);
                    events.push(LedgerEvent::Emitted(replacement.clone()));
                    still_holding.insert(key, replacement);
                }
                None => {
                    events.push(LedgerEvent::Emitted(opportunity.clone()));
                    still_holding.insert(key, opportunity);
                }
            }
        }

        for (_, gone) in ledger.active.drain() {
            events.push(LedgerEvent::Withdrawn(WithdrawnEvent {
                id: gone.id,
                kind: gone.kind,
                market: gone.market,
                book_version: version,
            }));
        }
        ledger.active = still_holding;
        events
    }

    /// Opportunities currently standing for `market`.
    #[must_use]
    pub fn active(&self, market: &MarketId) -> usize {
        self.markets.get(market).map_or(0, |l| l.active.len())
    }

    /// Drop everything remembered about `market`.
    ///
    /// Called once the market has left the book; a recreated market starts
    /// again from version 0.
    pub fn forget(&mut self, market: &MarketId) {
        self.markets.remove(market);
    }

    /// Markets this ledger has reconciled.
    pub fn markets(&self) -> impl Iterator<Item = &MarketId> {
        self.markets.keys()
    }
}

fn is_material(previous: &Opportunity, current: &Opportunity, tolerance: f64) -> bool {
    !previous.same_prices(current) || (previous.edge - current.edge).abs() > tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fair::{DevigMethod, ReferenceSource};
    use crate::domain::id::SelectionId;
    use crate::domain::money::Odds;
    use crate::domain::opportunity::OpportunityKind;
    use crate::domain::quote::Quote;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn entry(quotes: &[(&str, &str, Decimal)]) -> MarketBookEntry {
        let now = Utc::now();
        let mut entry = MarketBookEntry::new(MarketId::from("m1"));
        for (seq, (book, sel, odds)) in quotes.iter().enumerate() {
            let q = Quote::new(*book, "m1", *sel, Odds::try_new(*odds).unwrap(), seq as u64 + 1, now);
            entry.apply(q.into()).unwrap();
        }
        entry
    }

    fn fair(entry: &MarketBookEntry, probs: &[(&str, f64)]) -> FairPriceEstimate {
        FairPriceEstimate {
            market: entry.market().clone(),
            method: DevigMethod::Multiplicative,
            reference: ReferenceSource::Consensus,
            book_version: entry.version(),
            probabilities: probs
                .iter()
                .map(|(s, p)| (SelectionId::from(*s), *p))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn ev_threshold_is_exclusive() {
        let e = entry(&[("a", "home", dec!(2.00)), ("a", "away", dec!(1.80))]);
        let f = fair(&e, &[("home", 0.55), ("away", 0.45)]);

        let strict = OpportunityDetector::new(DetectorSettings {
            ev_threshold: 0.03,
            ..DetectorSettings::default()
        });
        let found = strict.detect_ev(&e, &f);
        assert_eq!(found.len(), 1);
        assert!((found[0].edge - 0.10).abs() < 1e-9);
        assert_eq!(found[0].legs[0].selection.as_str(), "home");

        let high = OpportunityDetector::new(DetectorSettings {
            ev_threshold: 0.12,
            ..DetectorSettings::default()
        });
        assert!(high.detect_ev(&e, &f).is_empty());
    }

    #[test]
    fn stale_fair_estimate_is_ignored() {
        let e = entry(&[("a", "home", dec!(2.00)), ("a", "away", dec!(1.80))]);
        let mut f = fair(&e, &[("home", 0.55), ("away", 0.45)]);
        f.book_version -= 1;
        let found = OpportunityDetector::default().evaluate(&e, Some(&f));
        assert!(found.iter().all(|o| o.kind != OpportunityKind::Ev));
    }

    #[test]
    fn three_way_at_2_10_is_not_arbitrage() {
        let e = entry(&[
            ("a", "home", dec!(2.10)),
            ("b", "draw", dec!(2.10)),
            ("c", "away", dec!(2.10)),
        ]);
        assert!(OpportunityDetector::default().detect_arbitrage(&e).is_none());
    }

    #[test]
    fn two_way_at_2_50_is_arbitrage_with_even_split() {
        let e = entry(&[
            ("a", "home", dec!(2.50)),
            ("a", "away", dec!(1.50)),
            ("b", "away", dec!(2.50)),
            ("b", "home", dec!(1.40)),
        ]);
        let opp = OpportunityDetector::default().detect_arbitrage(&e).unwrap();
        assert_eq!(opp.kind, OpportunityKind::Arbitrage);
        assert!((opp.edge - 0.2).abs() < 1e-9);
        let allocation = opp.allocation.as_ref().unwrap();
        assert_eq!(allocation.fractions, vec![dec!(0.5), dec!(0.5)]);
        assert_eq!(allocation.guaranteed_return, dec!(0.25));
        let books: Vec<_> = opp.legs.iter().map(|l| l.sportsbook.as_str()).collect();
        assert_eq!(books, vec!["b", "a"]);
    }

    #[test]
    fn safety_margin_suppresses_thin_arbitrage() {
        let e = entry(&[("a", "home", dec!(2.01)), ("b", "away", dec!(2.01))]);
        assert!(OpportunityDetector::default().detect_arbitrage(&e).is_none());
    }

    #[test]
    fn incomplete_market_is_not_arbitrage() {
        let mut e = entry(&[("a", "home", dec!(3.0)), ("b", "away", dec!(3.0))]);
        e.evict_older_than(Utc::now() + chrono::Duration::seconds(1));
        e.apply(
            Quote::new("a", "m1", "home", Odds::try_new(dec!(3.0)).unwrap(), 10, Utc::now()).into(),
        )
        .unwrap();
        assert!(OpportunityDetector::default().detect_arbitrage(&e).is_none());
    }

    #[test]
    fn ledger_emits_once_then_supersedes_then_withdraws() {
        let market = MarketId::from("m1");
        let mut ledger = OpportunityLedger::new(0.001);
        let detector = OpportunityDetector::default();

        let e1 = entry(&[("a", "home", dec!(2.50)), ("b", "away", dec!(2.50))]);
        let first = ledger.reconcile(&market, 2, detector.evaluate(&e1, None));
        let LedgerEvent::Emitted(original) = &first[0] else {
            panic!("expected emission");
        };
        assert!(original.supersedes.is_none());

        // same version again: nothing
        assert!(ledger
            .reconcile(&market, 2, detector.evaluate(&e1, None))
            .is_empty());
        // newer version, same prices: nothing
        assert!(ledger
            .reconcile(&market, 3, detector.evaluate(&e1, None))
            .is_empty());

        let e2 = entry(&[("a", "home", dec!(2.60)), ("b", "away", dec!(2.50))]);
        let moved = ledger.reconcile(&market, 4, detector.evaluate(&e2, None));
        let LedgerEvent::Emitted(updated) = &moved[0] else {
            panic!("expected supersede");
        };
        assert_eq!(updated.supersedes, Some(original.id));
        assert_ne!(updated.id, original.id);

        let gone = ledger.reconcile(&market, 5, Vec::new());
        assert!(matches!(&gone[0], LedgerEvent::Withdrawn(w) if w.id == updated.id));
        assert_eq!(ledger.active(&market), 0);
    }
}
