mod support;

use std::collections::BTreeMap;

use rust_decimal_macros::dec;

use sharpline::application::detector::{
    DetectorSettings, LedgerEvent, OpportunityDetector, OpportunityLedger,
};
use sharpline::application::pricing::FairPriceEngine;
use sharpline::domain::fair::{DevigMethod, FairPriceEstimate, ReferenceSource};
use sharpline::domain::id::{MarketId, SelectionId, SportsbookId};
use sharpline::domain::opportunity::OpportunityKind;
use sharpline::testkit::domain::entry;
use support::assertions::{assert_decimal_near, assert_f64_near};

fn detector(ev_threshold: f64) -> OpportunityDetector {
    OpportunityDetector::new(DetectorSettings {
        ev_threshold,
        ..DetectorSettings::default()
    })
}

fn engine() -> FairPriceEngine {
    FairPriceEngine::new(0.6, 2.0)
}

#[test]
fn three_way_market_at_two_ten_is_not_arbitrage() {
    let book = entry(
        "f1:moneyline",
        &[
            ("pinnacle", "home", dec!(2.10)),
            ("draftkings", "draw", dec!(2.10)),
            ("fanduel", "away", dec!(2.10)),
        ],
    );
    assert!(detector(0.03).detect_arbitrage(&book).is_none());
}

#[test]
fn two_way_market_at_two_fifty_is_arbitrage_with_even_split() {
    let book = entry(
        "f1:moneyline",
        &[("pinnacle", "home", dec!(2.50)), ("draftkings", "away", dec!(2.50))],
    );
    let arb = detector(0.03).detect_arbitrage(&book).expect("arbitrage");

    assert_eq!(arb.kind, OpportunityKind::Arbitrage);
    assert_eq!(arb.legs.len(), 2);
    assert_eq!(arb.book_version, book.version());
    assert_f64_near(arb.edge, 0.2, 1e-9);

    let allocation = arb.allocation.expect("allocation");
    assert_eq!(allocation.implied_total, dec!(0.8));
    assert_eq!(allocation.fractions, vec![dec!(0.5), dec!(0.5)]);
    assert_decimal_near(allocation.guaranteed_return, dec!(0.25), dec!(0.0000001));
    assert_eq!(allocation.stakes_for(dec!(100)), vec![dec!(50), dec!(50)]);
    assert_decimal_near(allocation.payout_for(dec!(100)), dec!(125), dec!(0.0000001));
}

#[test]
fn arbitrage_legs_take_the_best_price_per_selection() {
    let book = entry(
        "f1:moneyline",
        &[
            ("pinnacle", "home", dec!(2.05)),
            ("draftkings", "home", dec!(2.20)),
            ("pinnacle", "away", dec!(2.10)),
            ("fanduel", "away", dec!(1.95)),
        ],
    );
    let arb = detector(0.03).detect_arbitrage(&book).expect("arbitrage");
    let legs: Vec<_> = arb
        .legs
        .iter()
        .map(|l| (l.selection.as_str(), l.sportsbook.as_str(), l.odds.value()))
        .collect();
    assert_eq!(
        legs,
        vec![("away", "pinnacle", dec!(2.10)), ("home", "draftkings", dec!(2.20))]
    );
}

#[test]
fn arbitrage_inside_safety_margin_is_ignored() {
    // 1/2.01 + 1/2.01 = 0.995..., within the default 0.5% margin.
    let book = entry(
        "f1:moneyline",
        &[("pinnacle", "home", dec!(2.01)), ("draftkings", "away", dec!(2.01))],
    );
    assert!(detector(0.03).detect_arbitrage(&book).is_none());
}

#[test]
fn ev_is_price_times_fair_probability_minus_one() {
    let book = entry(
        "f1:moneyline",
        &[("draftkings", "home", dec!(2.00)), ("draftkings", "away", dec!(1.70))],
    );
    let fair = FairPriceEstimate {
        market: MarketId::from("f1:moneyline"),
        method: DevigMethod::Multiplicative,
        reference: ReferenceSource::Sharp(SportsbookId::from("pinnacle")),
        book_version: book.version(),
        probabilities: BTreeMap::from([
            (SelectionId::from("home"), 0.55),
            (SelectionId::from("away"), 0.45),
        ]),
    };

    let found = detector(0.03).detect_ev(&book, &fair);
    assert_eq!(found.len(), 1);
    let ev = &found[0];
    assert_eq!(ev.kind, OpportunityKind::Ev);
    assert_eq!(ev.legs[0].selection, SelectionId::from("home"));
    assert_f64_near(ev.edge, 0.10, 1e-9);
    assert_eq!(ev.fair_probability, Some(0.55));

    assert!(detector(0.12).detect_ev(&book, &fair).is_empty());
}

#[test]
fn evaluation_ignores_fair_prices_from_another_version() {
    let book = entry(
        "f1:moneyline",
        &[("draftkings", "home", dec!(2.00)), ("draftkings", "away", dec!(1.70))],
    );
    let fair = FairPriceEstimate {
        market: MarketId::from("f1:moneyline"),
        method: DevigMethod::Multiplicative,
        reference: ReferenceSource::BestPrice,
        book_version: book.version() + 1,
        probabilities: BTreeMap::from([
            (SelectionId::from("home"), 0.55),
            (SelectionId::from("away"), 0.45),
        ]),
    };
    assert!(detector(0.03).evaluate(&book, Some(&fair)).is_empty());
}

#[test]
fn devig_methods_sum_to_one() {
    for method in [DevigMethod::Multiplicative, DevigMethod::Power] {
        for prices in [vec![1.91, 1.91], vec![2.5, 3.4, 2.9], vec![1.25, 4.5, 11.0]] {
            let probabilities = method.devig(&prices).expect("devig");
            assert_eq!(probabilities.len(), prices.len());
            assert_f64_near(probabilities.iter().sum(), 1.0, 1e-9);
        }
    }
}

#[test]
fn power_devig_favours_the_favourite() {
    let prices = [1.25, 4.5, 11.0];
    let multiplicative = DevigMethod::Multiplicative.devig(&prices).unwrap();
    let power = DevigMethod::Power.devig(&prices).unwrap();
    assert!(power[0] > multiplicative[0]);
    assert!(power[2] < multiplicative[2]);
}

#[test]
fn devig_rejects_degenerate_markets() {
    assert!(DevigMethod::Multiplicative.devig(&[2.0]).is_none());
    assert!(DevigMethod::Power.devig(&[1.0, 2.0]).is_none());
    assert!(DevigMethod::Multiplicative.devig(&[f64::NAN, 2.0]).is_none());
}

#[test]
fn best_price_reference_on_symmetric_market_is_even() {
    let book = entry(
        "f1:moneyline",
        &[("pinnacle", "home", dec!(1.91)), ("pinnacle", "away", dec!(1.91))],
    );
    let fair = engine()
        .estimate(&book, DevigMethod::Multiplicative, &ReferenceSource::BestPrice)
        .expect("estimate");
    assert_eq!(fair.book_version, book.version());
    assert_f64_near(fair.probability(&SelectionId::from("home")).unwrap(), 0.5, 1e-12);
    assert_f64_near(fair.fair_odds(&SelectionId::from("away")).unwrap(), 2.0, 1e-12);
}

#[test]
fn sharp_reference_without_the_book_is_absent() {
    let book = entry(
        "f1:moneyline",
        &[("draftkings", "home", dec!(1.91)), ("draftkings", "away", dec!(1.91))],
    );
    let sharp = ReferenceSource::Sharp(SportsbookId::from("pinnacle"));
    assert!(engine().estimate(&book, DevigMethod::Power, &sharp).is_none());
}

#[test]
fn single_selection_market_has_no_fair_price() {
    let book = entry("f1:moneyline", &[("pinnacle", "home", dec!(1.91))]);
    assert!(engine()
        .estimate_all(&book, &[DevigMethod::Multiplicative, DevigMethod::Power], &ReferenceSource::Consensus)
        .is_empty());
}

#[test]
fn ledger_emits_holds_supersedes_and_withdraws() {
    let market = MarketId::from("f1:moneyline");
    let detector = detector(0.03);
    let mut ledger = OpportunityLedger::new(0.001);

    let first = entry(
        "f1:moneyline",
        &[("pinnacle", "home", dec!(2.50)), ("draftkings", "away", dec!(2.50))],
    );
    let events = ledger.reconcile(&market, 2, detector.evaluate(&first, None));
    let emitted = match events.as_slice() {
        [LedgerEvent::Emitted(o)] => o.clone(),
        other => panic!("expected one emission, got {other:?}"),
    };
    assert!(emitted.supersedes.is_none());

    // Same prices at a later version: nothing new.
    assert!(ledger
        .reconcile(&market, 3, detector.evaluate(&first, None))
        .is_empty());
    // Replayed version: nothing at all.
    assert!(ledger
        .reconcile(&market, 3, detector.evaluate(&first, None))
        .is_empty());

    let moved = entry(
        "f1:moneyline",
        &[("pinnacle", "home", dec!(2.60)), ("draftkings", "away", dec!(2.50))],
    );
    let events = ledger.reconcile(&market, 4, detector.evaluate(&moved, None));
    match events.as_slice() {
        [LedgerEvent::Emitted(o)] => assert_eq!(o.supersedes, Some(emitted.id)),
        other => panic!("expected a superseding emission, got {other:?}"),
    }
    assert_eq!(ledger.active(&market), 1);

    let closed = entry(
        "f1:moneyline",
        &[("pinnacle", "home", dec!(1.80)), ("draftkings", "away", dec!(2.00))],
    );
    let events = ledger.reconcile(&market, 5, detector.evaluate(&closed, None));
    match events.as_slice() {
        [LedgerEvent::Withdrawn(w)] => {
            assert_eq!(w.kind, OpportunityKind::Arbitrage);
            assert_eq!(w.book_version, 5);
        }
        other => panic!("expected a withdrawal, got {other:?}"),
    }
    assert_eq!(ledger.active(&market), 0);
}
