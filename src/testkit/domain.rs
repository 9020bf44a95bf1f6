//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for raw events, quotes, catalogs and
//! market books so tests focus on assertions rather than construction
//! boilerplate.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::book::MarketBookEntry;
use crate::domain::catalog::{Catalog, CatalogEntry, Category};
use crate::domain::id::{EventPosition, LeagueId, MarketId, SportId};
use crate::domain::money::Odds;
use crate::domain::quote::Quote;
use crate::port::outbound::feed::{
    FeedEvent, OddsBatch, RawEvent, RawEventKind, RawPrice, Subscription,
};

/// Subscription for `sport` covering `leagues`, every book and market.
pub fn subscription(sport: &str, leagues: &[&str]) -> Subscription {
    Subscription {
        sport: SportId::from(sport),
        leagues: leagues.iter().map(|l| LeagueId::from(*l)).collect(),
        sportsbooks: Vec::new(),
        markets: Vec::new(),
        main_lines_only: true,
    }
}

/// Catalog with soccer / `epl` active and nothing else restricted.
pub fn catalog() -> Catalog {
    Catalog::from_entries(vec![
        CatalogEntry::new(Category::Sport, "soccer", "Soccer"),
        CatalogEntry::league("soccer", "epl", "Premier League"),
    ])
    .unwrap()
}

/// Decimal-odds update for an EPL fixture.
pub fn raw_odds(book: &str, fixture: &str, market: &str, selection: &str, price: &str, sequence: u64) -> RawEvent {
    RawEvent {
        kind: RawEventKind::Odds,
        sequence,
        sport: Some("soccer".into()),
        league: Some("epl".into()),
        sportsbook: Some(book.into()),
        fixture: Some(fixture.into()),
        market: Some(market.into()),
        selection: Some(selection.into()),
        price: Some(RawPrice::Decimal(price.into())),
        line: None,
        is_main: Some(true),
        is_live: false,
        observed_at: Utc::now(),
    }
}

/// Suspension of one book's price.
pub fn raw_locked(book: &str, fixture: &str, market: &str, selection: &str, sequence: u64) -> RawEvent {
    RawEvent {
        kind: RawEventKind::Locked,
        price: None,
        ..raw_odds(book, fixture, market, selection, "2.0", sequence)
    }
}

/// Batch at `position` holding `events`.
pub fn batch(position: &str, events: Vec<RawEvent>) -> OddsBatch {
    OddsBatch {
        position: Some(EventPosition::from(position)),
        events,
        malformed: 0,
    }
}

/// Empty [`FeedEvent::Batch`] at `position`.
pub fn batch_event(position: &str) -> FeedEvent {
    FeedEvent::Batch(batch(position, Vec::new()))
}

/// Open quote observed now.
pub fn quote(book: &str, market: &str, selection: &str, odds: Decimal, sequence: u64) -> Quote {
    Quote::new(book, market, selection, Odds::try_new(odds).unwrap(), sequence, Utc::now())
}

/// Market book entry holding `quotes` as `(book, selection, odds)`.
pub fn entry(market: &str, quotes: &[(&str, &str, Decimal)]) -> MarketBookEntry {
    let mut entry = MarketBookEntry::new(MarketId::from(market));
    for (i, (book, selection, odds)) in quotes.iter().enumerate() {
        entry
            .apply(quote(book, market, selection, *odds, i as u64 + 1).into())
            .unwrap();
    }
    entry
}
