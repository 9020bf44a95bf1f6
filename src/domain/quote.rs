//! Canonical quotes produced by normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{MarketId, SelectionId, SportsbookId};
use super::money::Odds;

/// Identity of a quote: one book's price on one selection of one market.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteKey {
    pub sportsbook: SportsbookId,
    pub market: MarketId,
    pub selection: SelectionId,
}

/// One sportsbook's price on one selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub sportsbook: SportsbookId,
    pub market: MarketId,
    pub selection: SelectionId,
    pub odds: Odds,
    /// Monotonic per feed; a stored quote is only replaced by a higher one.
    pub sequence: u64,
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(
        sportsbook: impl Into<SportsbookId>,
        market: impl Into<MarketId>,
        selection: impl Into<SelectionId>,
        odds: Odds,
        sequence: u64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sportsbook: sportsbook.into(),
            market: market.into(),
            selection: selection.into(),
            odds,
            sequence,
            observed_at,
        }
    }

    #[must_use]
    pub fn key(&self) -> QuoteKey {
        QuoteKey {
            sportsbook: self.sportsbook.clone(),
            market: self.market.clone(),
            selection: self.selection.clone(),
        }
    }
}

/// A book suspended its price on a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub key: QuoteKey,
    pub sequence: u64,
    pub observed_at: DateTime<Utc>,
}

/// Change to a single (sportsbook, market, selection) slot.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteUpdate {
    Open(Quote),
    Locked(Lock),
}

impl QuoteUpdate {
    #[must_use]
    pub fn market(&self) -> &MarketId {
        match self {
            Self::Open(q) => &q.market,
            Self::Locked(l) => &l.key.market,
        }
    }

    #[must_use]
    pub fn sportsbook(&self) -> &SportsbookId {
        match self {
            Self::Open(q) => &q.sportsbook,
            Self::Locked(l) => &l.key.sportsbook,
        }
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionId {
        match self {
            Self::Open(q) => &q.selection,
            Self::Locked(l) => &l.key.selection,
        }
    }

    #[must_use]
    pub const fn sequence(&self) -> u64 {
        match self {
            Self::Open(q) => q.sequence,
            Self::Locked(l) => l.sequence,
        }
    }

    #[must_use]
    pub const fn observed_at(&self) -> DateTime<Utc> {
        match self {
            Self::Open(q) => q.observed_at,
            Self::Locked(l) => l.observed_at,
        }
    }
}

impl From<Quote> for QuoteUpdate {
    fn from(quote: Quote) -> Self {
        Self::Open(quote)
    }
}

impl From<Lock> for QuoteUpdate {
    fn from(lock: Lock) -> Self {
        Self::Locked(lock)
    }
}
