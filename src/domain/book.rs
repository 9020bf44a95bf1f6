//! Per-market aggregate of the latest quote from every sportsbook.
//!
//! A [`MarketBookEntry`] is mutated by exactly one writer at a time and read
//! through cloned snapshots. Every accepted mutation bumps `version`, so a
//! snapshot's version identifies the exact state it was taken from.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::id::{MarketId, SelectionId, SportsbookId};
use super::quote::{Quote, QuoteUpdate};

/// Why [`MarketBookEntry::apply`] did not change the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// An update with the same or a higher sequence is already stored.
    NotNewer,
    /// The update is for a different market.
    WrongMarket,
}

/// What a book currently has for one (sportsbook, selection).
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Open(Quote),
    /// Suspended. Kept so an older open quote delivered late cannot
    /// resurrect the price.
    Locked {
        sequence: u64,
        observed_at: DateTime<Utc>,
    },
}

impl Slot {
    const fn sequence(&self) -> u64 {
        match self {
            Self::Open(q) => q.sequence,
            Self::Locked { sequence, .. } => *sequence,
        }
    }

    const fn observed_at(&self) -> DateTime<Utc> {
        match self {
            Self::Open(q) => q.observed_at,
            Self::Locked { observed_at, .. } => *observed_at,
        }
    }

    const fn open(&self) -> Option<&Quote> {
        match self {
            Self::Open(q) => Some(q),
            Self::Locked { .. } => None,
        }
    }
}

/// Quotes for a single selection keyed by sportsbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionBook {
    slots: BTreeMap<SportsbookId, Slot>,
    last_update: Option<DateTime<Utc>>,
}

impl SelectionBook {
    /// Open (bettable) quotes in sportsbook order.
    pub fn open_quotes(&self) -> impl Iterator<Item = &Quote> {
        self.slots.values().filter_map(Slot::open)
    }

    /// The open quote with the highest odds. Ties go to the first book in id order.
    #[must_use]
    pub fn best(&self) -> Option<&Quote> {
        self.open_quotes().fold(None, |best: Option<&Quote>, q| match best {
            Some(b) if b.odds >= q.odds => Some(b),
            _ => Some(q),
        })
    }

    /// A specific book's open quote.
    #[must_use]
    pub fn from_book(&self, book: &SportsbookId) -> Option<&Quote> {
        self.slots.get(book).and_then(Slot::open)
    }

    /// Time of the most recent accepted update for this selection.
    #[must_use]
    pub const fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    fn has_open(&self) -> bool {
        self.open_quotes().next().is_some()
    }
}

/// Latest non-stale quote per (sportsbook, selection) for one market.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketBookEntry {
    market: MarketId,
    selections: BTreeMap<SelectionId, SelectionBook>,
    version: u64,
}

impl MarketBookEntry {
    /// Create an empty entry at version 0.
    #[must_use]
    pub fn new(market: MarketId) -> Self {
        Self {
            market,
            selections: BTreeMap::new(),
            version: 0,
        }
    }

    /// Apply an update if it is newer than what is stored for the same
    /// (sportsbook, selection).
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] reason when the book is left unchanged.
    pub fn apply(&mut self, update: QuoteUpdate) -> Result<(), Rejection> {
        if update.market() != &self.market {
            return Err(Rejection::WrongMarket);
        }
        let sequence = update.sequence();
        let observed_at = update.observed_at();
        let selection = self
            .selections
            .entry(update.selection().clone())
            .or_default();
        if let Some(existing) = selection.slots.get(update.sportsbook()) {
            if existing.sequence() >= sequence {
                return Err(Rejection::NotNewer);
            }
        }
        let (book, slot) = match update {
            QuoteUpdate::Open(q) => (q.sportsbook.clone(), Slot::Open(q)),
            QuoteUpdate::Locked(l) => (
                l.key.sportsbook,
                Slot::Locked {
                    sequence,
                    observed_at,
                },
            ),
        };
        selection.slots.insert(book, slot);
        selection.last_update = Some(
            selection
                .last_update
                .map_or(observed_at, |t| t.max(observed_at)),
        );
        self.version += 1;
        Ok(())
    }

    /// Drop every quote observed before `cutoff`.
    ///
    /// Returns the number of open quotes removed. The version is bumped when
    /// anything visible changed.
    pub fn evict_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        for selection in self.selections.values_mut() {
            selection.slots.retain(|_, slot| {
                if slot.observed_at() >= cutoff {
                    return true;
                }
                if slot.open().is_some() {
                    evicted += 1;
                }
                false
            });
        }
        if evicted > 0 {
            self.version += 1;
        }
        evicted
    }

    #[must_use]
    pub const fn market(&self) -> &MarketId {
        &self.market
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Every selection ever quoted for this market.
    pub fn selections(&self) -> impl Iterator<Item = (&SelectionId, &SelectionBook)> {
        self.selections.iter()
    }

    #[must_use]
    pub fn selection(&self, id: &SelectionId) -> Option<&SelectionBook> {
        self.selections.get(id)
    }

    #[must_use]
    pub fn selection_count(&self) -> usize {
        self.selections.len()
    }

    /// True when every known selection has at least one open quote.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.selections.is_empty() && self.selections.values().all(SelectionBook::has_open)
    }

    /// True when no open quote remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.selections.values().any(SelectionBook::has_open)
    }

    /// True when nothing at all is stored, lock markers included.
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        self.selections.values().all(|s| s.slots.is_empty())
    }

    /// Observation time of the oldest open quote, the first to go stale.
    #[must_use]
    pub fn oldest_open_observed(&self) -> Option<DateTime<Utc>> {
        self.selections
            .values()
            .flat_map(SelectionBook::open_quotes)
            .map(|q| q.observed_at)
            .min()
    }

    /// Number of open quotes across all selections.
    #[must_use]
    pub fn open_quote_count(&self) -> usize {
        self.selections.values().map(|s| s.open_quotes().count()).sum()
    }

    /// Sportsbooks that currently quote every selection of the market.
    #[must_use]
    pub fn books_quoting_all(&self) -> Vec<SportsbookId> {
        let mut books: Option<BTreeSet<&SportsbookId>> = None;
        for selection in self.selections.values() {
            let quoting: BTreeSet<_> = selection.open_quotes().map(|q| &q.sportsbook).collect();
            books = Some(match books {
                None => quoting,
                Some(acc) => acc.intersection(&quoting).copied().collect(),
            });
        }
        books.unwrap_or_default().into_iter().cloned().collect()
    }
}
