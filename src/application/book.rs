//! Concurrent store of market book entries.
//!
//! Each market has its own mutex, so writers of different markets never
//! contend. The map's shard lock is only held while looking an entry up or
//! inserting it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::domain::book::{MarketBookEntry, Rejection};
use crate::domain::id::MarketId;
use crate::domain::quote::QuoteUpdate;

/// Result of [`MarketBook::apply`].
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// Consistent copy of the market after the update, stale quotes removed.
    pub snapshot: MarketBookEntry,
    /// True when the update was accepted.
    pub changed: bool,
    /// Open quotes evicted as stale while applying.
    pub evicted: usize,
    pub rejection: Option<BookRejection>,
}

/// Why an update left the book unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookRejection {
    /// A same-or-newer sequence is already stored.
    NotNewer,
    /// The update was observed before the staleness window.
    Stale,
}

/// Result of a stale sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Snapshots of markets that lost at least one open quote.
    pub changed: Vec<MarketBookEntry>,
    /// Markets dropped because nothing was left in them.
    pub removed: Vec<MarketId>,
    /// Open quotes evicted across all markets.
    pub evicted: usize,
}

/// All market books, keyed by market id.
pub struct MarketBook {
    markets: DashMap<MarketId, Arc<Mutex<MarketBookEntry>>>,
    staleness: Duration,
}

impl MarketBook {
    /// Create an empty book that treats quotes older than `staleness` as gone.
    #[must_use]
    pub fn new(staleness: std::time::Duration) -> Self {
        Self {
            markets: DashMap::new(),
            staleness: Duration::from_std(staleness).unwrap_or_else(|_| Duration::days(3650)),
        }
    }

    fn entry(&self, market: &MarketId) -> Arc<Mutex<MarketBookEntry>> {
        if let Some(entry) = self.markets.get(market) {
            return Arc::clone(entry.value());
        }
        Arc::clone(
            self.markets
                .entry(market.clone())
                .or_insert_with(|| Arc::new(Mutex::new(MarketBookEntry::new(market.clone()))))
                .value(),
        )
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.staleness)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Apply an update and return a snapshot taken under the same lock.
    pub fn apply(&self, update: QuoteUpdate, now: DateTime<Utc>) -> ApplyOutcome {
        let cutoff = self.cutoff(now);
        let entry = self.entry(update.market());
        let mut guard = entry.lock();
        let evicted = guard.evict_older_than(cutoff);

        let rejection = if update.observed_at() < cutoff {
            Some(BookRejection::Stale)
        } else {
            match guard.apply(update) {
                Ok(()) => None,
                Err(Rejection::NotNewer) => Some(BookRejection::NotNewer),
                // entry() keys by the update's own market
                Err(Rejection::WrongMarket) => Some(BookRejection::NotNewer),
            }
        };

        ApplyOutcome {
            snapshot: guard.clone(),
            changed: rejection.is_none(),
            evicted,
            rejection,
        }
    }

    /// Consistent copy of one market with stale quotes evicted first.
    #[must_use]
    pub fn snapshot(&self, market: &MarketId, now: DateTime<Utc>) -> Option<MarketBookEntry> {
        self.refresh(market, now).map(|(snapshot, _)| snapshot)
    }

    /// [`MarketBook::snapshot`] that also reports how many quotes it evicted.
    pub fn refresh(&self, market: &MarketId, now: DateTime<Utc>) -> Option<(MarketBookEntry, usize)> {
        let entry = Arc::clone(self.markets.get(market)?.value());
        let mut guard = entry.lock();
        let evicted = guard.evict_older_than(self.cutoff(now));
        Some((guard.clone(), evicted))
    }

    /// When the oldest open quote of `entry` falls out of the staleness window.
    #[must_use]
    pub fn expires_at(&self, entry: &MarketBookEntry) -> Option<DateTime<Utc>> {
        entry
            .oldest_open_observed()?
            .checked_add_signed(self.staleness)
    }

    /// Evict stale quotes from every market and drop markets left vacant.
    pub fn sweep_stale(&self, now: DateTime<Utc>) -> SweepReport {
        self.sweep_where(now, |_| true)
    }

    /// [`MarketBook::sweep_stale`] restricted to the markets `owned` accepts.
    ///
    /// Pipeline workers sweep only their own shard so the snapshots they get
    /// back are never older than ones they already evaluated.
    pub fn sweep_where(&self, now: DateTime<Utc>, owned: impl Fn(&MarketId) -> bool) -> SweepReport {
        let cutoff = self.cutoff(now);
        let entries: Vec<_> = self
            .markets
            .iter()
            .filter(|e| owned(e.key()))
            .map(|e| Arc::clone(e.value()))
            .collect();

        let mut report = SweepReport::default();
        let mut vacant = Vec::new();
        for entry in entries {
            let mut guard = entry.lock();
            let removed = guard.evict_older_than(cutoff);
            if removed > 0 {
                report.evicted += removed;
                report.changed.push(guard.clone());
            }
            if guard.is_vacant() {
                vacant.push(guard.market().clone());
            }
        }

        for market in vacant {
            // Re-check under the shard lock; a writer may have refilled it.
            if self
                .markets
                .remove_if(&market, |_, entry| entry.lock().is_vacant())
                .is_some()
            {
                report.removed.push(market);
            }
        }
        if report.evicted > 0 {
            debug!(
                evicted = report.evicted,
                markets = report.changed.len(),
                removed = report.removed.len(),
                "Swept stale quotes"
            );
        }
        report
    }

    #[must_use]
    pub fn contains(&self, market: &MarketId) -> bool {
        self.markets.contains_key(market)
    }

    /// Number of tracked markets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}
