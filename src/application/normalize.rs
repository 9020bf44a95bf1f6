//! Raw feed events to canonical quote updates.
//!
//! Every rejection is counted by reason on [`PipelineStats`] and never
//! interrupts the stream.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::trace;

use super::stats::{DropReason, PipelineStats};
use crate::domain::catalog::{Catalog, Category, SportsbookPolicy};
use crate::domain::id::{canonical_key, MarketId, SelectionId, SportsbookId};
use crate::domain::money::Odds;
use crate::domain::quote::{Lock, Quote, QuoteKey, QuoteUpdate};
use crate::port::outbound::feed::{RawEvent, RawEventKind, RawPrice};

/// Filters applied on top of the catalog and sportsbook policy.
#[derive(Debug, Clone, Default)]
pub struct NormalizeRules {
    /// Canonical market keys to keep. Empty keeps every market.
    pub markets: Vec<String>,
    /// League ids to keep. Empty keeps every league.
    pub leagues: Vec<String>,
    pub main_lines_only: bool,
    pub exclude_live: bool,
}

/// Turns [`RawEvent`]s into [`QuoteUpdate`]s.
pub struct Normalizer {
    policy: SportsbookPolicy,
    markets: HashSet<String>,
    leagues: HashSet<String>,
    main_lines_only: bool,
    exclude_live: bool,
    stats: Arc<PipelineStats>,
}

impl Normalizer {
    #[must_use]
    pub fn new(policy: SportsbookPolicy, rules: NormalizeRules, stats: Arc<PipelineStats>) -> Self {
        Self {
            policy,
            markets: rules.markets.iter().map(|m| canonical_key(m)).collect(),
            leagues: rules.leagues.iter().map(|l| l.trim().to_lowercase()).collect(),
            main_lines_only: rules.main_lines_only,
            exclude_live: rules.exclude_live,
            stats,
        }
    }

    /// Normalize one event, counting the reason when it is dropped.
    pub fn normalize(&self, raw: &RawEvent, catalog: &Catalog) -> Option<QuoteUpdate> {
        match self.classify(raw, catalog) {
            Ok(update) => Some(update),
            Err(reason) => {
                trace!(reason = %reason, sequence = raw.sequence, "Dropped raw event");
                self.stats.record_drop(reason);
                None
            }
        }
    }

    /// Normalize one event without touching the counters.
    ///
    /// # Errors
    ///
    /// Returns the [`DropReason`] when the event cannot become a quote.
    pub fn classify(&self, raw: &RawEvent, catalog: &Catalog) -> Result<QuoteUpdate, DropReason> {
        let book = required(raw.sportsbook.as_deref()).map(canonical_key)?;
        if book.is_empty() {
            return Err(DropReason::MissingField);
        }
        let sportsbook = SportsbookId::new(book);
        if !self.policy.allows(&sportsbook) {
            return Err(DropReason::ExcludedSportsbook);
        }
        if catalog.has_category(Category::Sportsbook)
            && !catalog.is_active(Category::Sportsbook, sportsbook.as_str())
        {
            return Err(DropReason::InactiveSportsbook);
        }

        let sport = required(raw.sport.as_deref())?;
        if !is_active(catalog, Category::Sport, sport) {
            return Err(DropReason::InactiveSport);
        }
        let league = required(raw.league.as_deref())?;
        if !is_active(catalog, Category::League, league) {
            return Err(DropReason::InactiveLeague);
        }
        if !self.leagues.is_empty() && !self.leagues.contains(&league.to_lowercase()) {
            return Err(DropReason::InactiveLeague);
        }

        let fixture = required(raw.fixture.as_deref())?;
        let market_text = required(raw.market.as_deref())?;
        let selection_text = required(raw.selection.as_deref())?;
        let market_key = canonical_key(market_text);
        if market_key.is_empty() {
            return Err(DropReason::MissingField);
        }
        if is_nonexclusive_market(market_text) {
            return Err(DropReason::NonExclusiveMarket);
        }
        if !self.markets.is_empty() && !self.markets.contains(&market_key) {
            return Err(DropReason::FilteredMarket);
        }
        if catalog.has_category(Category::Market)
            && !catalog.is_active(Category::Market, &market_key)
        {
            return Err(DropReason::InactiveMarket);
        }

        if self.exclude_live && raw.is_live {
            return Err(DropReason::LiveExcluded);
        }
        if self.main_lines_only && raw.is_main == Some(false) {
            return Err(DropReason::AlternateLine);
        }

        let line = raw
            .line
            .as_deref()
            .map(|text| parse_decimal(text).ok_or(DropReason::InvalidLine))
            .transpose()?;

        let market = market_id(fixture, &market_key, line, raw.is_live);
        let selection = selection_id(selection_text, line);
        if selection.as_str().is_empty() {
            return Err(DropReason::MissingField);
        }

        match raw.kind {
            RawEventKind::Locked => Ok(QuoteUpdate::Locked(Lock {
                key: QuoteKey {
                    sportsbook,
                    market,
                    selection,
                },
                sequence: raw.sequence,
                observed_at: raw.observed_at,
            })),
            RawEventKind::Odds => {
                let price = raw.price.as_ref().ok_or(DropReason::InvalidPrice)?;
                let odds = parse_price(price).ok_or(DropReason::InvalidPrice)?;
                Ok(QuoteUpdate::Open(Quote::new(
                    sportsbook,
                    market,
                    selection,
                    odds,
                    raw.sequence,
                    raw.observed_at,
                )))
            }
        }
    }
}

fn required(field: Option<&str>) -> Result<&str, DropReason> {
    field
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(DropReason::MissingField)
}

/// Catalog ids are matched as sent, then lower-cased.
fn is_active(catalog: &Catalog, category: Category, id: &str) -> bool {
    catalog.is_active(category, id) || catalog.is_active(category, &id.to_lowercase())
}

/// Parse decimal text, accepting a leading `+`.
fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let text = text.strip_prefix('+').unwrap_or(text);
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Convert a provider price to decimal odds above 1.0.
#[must_use]
pub fn parse_price(price: &RawPrice) -> Option<Odds> {
    match price {
        RawPrice::Decimal(text) => Odds::try_new(parse_decimal(text)?).ok(),
        RawPrice::American(text) => Odds::from_american(parse_decimal(text)?),
    }
}

/// Markets whose selections can all win together (anytime scorers and the
/// like) cannot be devigged or arbitraged as a set.
#[must_use]
pub fn is_nonexclusive_market(market: &str) -> bool {
    let s = market.to_lowercase();
    let scorer_like = ["scorer", "to score", "touchdown", "goalscorer", "home run"]
        .iter()
        .any(|t| s.contains(t));
    if scorer_like && !(s.contains("first") || s.contains("1st")) {
        return true;
    }
    s.contains("anytime")
        && ["td", "touchdown", "goal", "home run", "scorer"]
            .iter()
            .any(|t| s.contains(t))
}

fn format_line(line: Decimal, signed: bool) -> String {
    let line = line.normalize();
    if signed && line > Decimal::ZERO {
        format!("+{line}")
    } else {
        line.to_string()
    }
}

/// `{fixture}:{market}[:{|line|}][:live]`.
///
/// Both sides of a spread carry opposite signs, so the absolute line is what
/// they share.
#[must_use]
pub fn market_id(fixture: &str, market_key: &str, line: Option<Decimal>, live: bool) -> MarketId {
    let mut id = format!("{}:{market_key}", fixture.trim());
    if let Some(line) = line {
        id.push(':');
        id.push_str(&format_line(line.abs(), false));
    }
    if live {
        id.push_str(":live");
    }
    MarketId::new(id)
}

/// Canonical selection name. Handicap sides get their signed line appended
/// when the name does not already carry it.
#[must_use]
pub fn selection_id(name: &str, line: Option<Decimal>) -> SelectionId {
    let key = canonical_key(name);
    let Some(line) = line else {
        return SelectionId::new(key);
    };
    let first = key.split('_').next().unwrap_or_default();
    if matches!(first, "over" | "under") {
        return SelectionId::new(key);
    }
    let signed = format_line(line, true);
    let unsigned = format_line(line, false);
    if key.split('_').any(|t| t == signed || t == unsigned) {
        return SelectionId::new(key);
    }
    SelectionId::new(format!("{key}_{signed}"))
}
