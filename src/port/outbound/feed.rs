//! Odds feed port.
//!
//! A feed is a push-style connection that delivers batches of provider-shaped
//! events. Reconnection, backoff and resumption are layered on top by the
//! session manager, so implementations only need to handle a single
//! connection attempt at a time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::id::{EventPosition, LeagueId, SportId, SportsbookId};
use crate::error::Error;

/// What a single feed connection should deliver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub sport: SportId,
    pub leagues: Vec<LeagueId>,
    /// Empty means every book the provider offers.
    pub sportsbooks: Vec<SportsbookId>,
    /// Empty means every market.
    pub markets: Vec<String>,
    pub main_lines_only: bool,
}

/// Whether an event carries a live price or suspends one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    Odds,
    Locked,
}

/// Price exactly as the provider sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPrice {
    /// Decimal odds text, e.g. `"2.45"`.
    Decimal(String),
    /// American odds text, e.g. `"-110"` or `"+145"`.
    American(String),
}

/// Provider-shaped odds update, prior to validation.
///
/// Every field the provider may omit is optional; the normalizer decides
/// what is required.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub kind: RawEventKind,
    /// Monotonically increasing within one feed.
    pub sequence: u64,
    pub sport: Option<String>,
    pub league: Option<String>,
    pub sportsbook: Option<String>,
    pub fixture: Option<String>,
    pub market: Option<String>,
    pub selection: Option<String>,
    pub price: Option<RawPrice>,
    /// Handicap or total line, when the market has one.
    pub line: Option<String>,
    pub is_main: Option<bool>,
    pub is_live: bool,
    /// Provider timestamp, falling back to receipt time.
    pub observed_at: DateTime<Utc>,
}

/// A group of events delivered together, with the position that follows them.
#[derive(Debug, Clone, PartialEq)]
pub struct OddsBatch {
    /// Position to resume after once the whole batch has been processed.
    pub position: Option<EventPosition>,
    pub events: Vec<RawEvent>,
    /// Items in the payload that could not be decoded at all.
    pub malformed: usize,
}

/// Items produced by [`OddsFeed::next_event`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Batch(OddsBatch),
    /// Keep-alive or status message carrying no odds.
    Heartbeat,
    /// The connection dropped; the caller should reconnect.
    Disconnected { reason: String },
}

/// A single connection to an odds provider.
#[async_trait]
pub trait OddsFeed: Send {
    /// Open the connection, replaying from `resume_from` when given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Feed`] classified as retryable or fatal.
    async fn connect(
        &mut self,
        subscription: &Subscription,
        resume_from: Option<&EventPosition>,
    ) -> Result<(), Error>;

    /// Next event, or `None` once the connection has ended.
    async fn next_event(&mut self) -> Option<FeedEvent>;

    /// Provider name for logging.
    fn provider_name(&self) -> &'static str;
}

/// Creates fresh feed connections for session groups.
pub type FeedFactory = Arc<dyn Fn() -> Box<dyn OddsFeed> + Send + Sync>;

#[async_trait]
impl OddsFeed for Box<dyn OddsFeed> {
    async fn connect(
        &mut self,
        subscription: &Subscription,
        resume_from: Option<&EventPosition>,
    ) -> Result<(), Error> {
        (**self).connect(subscription, resume_from).await
    }

    async fn next_event(&mut self) -> Option<FeedEvent> {
        (**self).next_event().await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}
