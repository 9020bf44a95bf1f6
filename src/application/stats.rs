//! Pipeline counters.
//!
//! Updated with relaxed atomics from every stage; read as a
//! [`StatsSnapshot`] for periodic logging.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Why the normalizer discarded a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Sportsbook, sport, league, fixture, market or selection absent.
    MissingField,
    /// Price missing from an open quote, unparseable, or not above 1.0.
    InvalidPrice,
    /// Line present but not a number.
    InvalidLine,
    /// Sportsbook excluded by policy.
    ExcludedSportsbook,
    InactiveSportsbook,
    InactiveSport,
    InactiveLeague,
    InactiveMarket,
    /// Market not on the configured allowlist.
    FilteredMarket,
    /// Selections are not mutually exclusive (anytime scorer and similar).
    NonExclusiveMarket,
    /// Alternate line while only main lines are kept.
    AlternateLine,
    /// In-play quote while live quotes are excluded.
    LiveExcluded,
}

impl DropReason {
    pub const ALL: [Self; 12] = [
        Self::MissingField,
        Self::InvalidPrice,
        Self::InvalidLine,
        Self::ExcludedSportsbook,
        Self::InactiveSportsbook,
        Self::InactiveSport,
        Self::InactiveLeague,
        Self::InactiveMarket,
        Self::FilteredMarket,
        Self::NonExclusiveMarket,
        Self::AlternateLine,
        Self::LiveExcluded,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidPrice => "invalid_price",
            Self::InvalidLine => "invalid_line",
            Self::ExcludedSportsbook => "excluded_sportsbook",
            Self::InactiveSportsbook => "inactive_sportsbook",
            Self::InactiveSport => "inactive_sport",
            Self::InactiveLeague => "inactive_league",
            Self::InactiveMarket => "inactive_market",
            Self::FilteredMarket => "filtered_market",
            Self::NonExclusiveMarket => "non_exclusive_market",
            Self::AlternateLine => "alternate_line",
            Self::LiveExcluded => "live_excluded",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters shared by sessions, dispatcher and workers.
#[derive(Debug, Default)]
pub struct PipelineStats {
    batches: AtomicU64,
    malformed: AtomicU64,
    updates_applied: AtomicU64,
    updates_rejected: AtomicU64,
    stale_rejected: AtomicU64,
    quotes_evicted: AtomicU64,
    opportunities_emitted: AtomicU64,
    opportunities_superseded: AtomicU64,
    opportunities_withdrawn: AtomicU64,
    reconnects: AtomicU64,
    drops: [AtomicU64; DropReason::ALL.len()],
}

impl PipelineStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&self, malformed: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.malformed.fetch_add(malformed as u64, Ordering::Relaxed);
    }

    pub fn record_drop(&self, reason: DropReason) {
        self.drops[reason.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_applied(&self) {
        self.updates_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// An update that lost to a newer (or equal) sequence.
    pub fn record_rejected(&self) {
        self.updates_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// An update that was already outside the staleness window on arrival.
    pub fn record_stale(&self) {
        self.stale_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: usize) {
        self.quotes_evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_emitted(&self, superseding: bool) {
        self.opportunities_emitted.fetch_add(1, Ordering::Relaxed);
        if superseding {
            self.opportunities_superseded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_withdrawn(&self) {
        self.opportunities_withdrawn.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn drops(&self, reason: DropReason) -> u64 {
        self.drops[reason.index()].load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            batches: load(&self.batches),
            malformed: load(&self.malformed),
            updates_applied: load(&self.updates_applied),
            updates_rejected: load(&self.updates_rejected),
            stale_rejected: load(&self.stale_rejected),
            quotes_evicted: load(&self.quotes_evicted),
            opportunities_emitted: load(&self.opportunities_emitted),
            opportunities_superseded: load(&self.opportunities_superseded),
            opportunities_withdrawn: load(&self.opportunities_withdrawn),
            reconnects: load(&self.reconnects),
            dropped: DropReason::ALL.iter().map(|r| self.drops(*r)).sum(),
        }
    }
}

/// Copy of [`PipelineStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub batches: u64,
    pub malformed: u64,
    pub updates_applied: u64,
    pub updates_rejected: u64,
    pub stale_rejected: u64,
    pub quotes_evicted: u64,
    pub opportunities_emitted: u64,
    pub opportunities_superseded: u64,
    pub opportunities_withdrawn: u64,
    pub reconnects: u64,
    /// Raw events dropped by the normalizer, all reasons.
    pub dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_reasons_index_their_own_slot() {
        for (i, reason) in DropReason::ALL.iter().enumerate() {
            assert_eq!(reason.index(), i);
        }
    }

    #[test]
    fn snapshot_sums_drops() {
        let stats = PipelineStats::new();
        stats.record_drop(DropReason::InvalidPrice);
        stats.record_drop(DropReason::InvalidPrice);
        stats.record_drop(DropReason::InactiveLeague);
        stats.record_emitted(true);
        stats.record_batch(2);

        let snap = stats.snapshot();
        assert_eq!(snap.dropped, 3);
        assert_eq!(snap.malformed, 2);
        assert_eq!(snap.opportunities_superseded, 1);
        assert_eq!(stats.drops(DropReason::InvalidPrice), 2);
    }
}
