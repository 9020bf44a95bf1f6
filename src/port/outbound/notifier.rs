//! Notifier port for opportunity and health events.
//!
//! The notifier registry is the only way results leave the engine.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::id::{MarketId, SportId};
use crate::domain::opportunity::{Opportunity, OpportunityKind};

/// Events that can trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// A new opportunity, or a material update of an earlier one
    /// (see [`Opportunity::supersedes`]).
    OpportunityDetected(Arc<Opportunity>),
    /// A previously emitted opportunity no longer holds.
    OpportunityWithdrawn(WithdrawnEvent),
    /// A session group exhausted its retry budget or hit a fatal error.
    GroupUnhealthy(GroupHealthEvent),
    /// A previously unhealthy group is receiving data again.
    GroupRecovered(GroupHealthEvent),
}

/// Withdrawal of an earlier opportunity.
#[derive(Debug, Clone)]
pub struct WithdrawnEvent {
    pub id: Uuid,
    pub kind: OpportunityKind,
    pub market: MarketId,
    /// Book version at which the opportunity stopped holding.
    pub book_version: u64,
}

/// Health transition of a session group.
#[derive(Debug, Clone)]
pub struct GroupHealthEvent {
    pub group: usize,
    pub sport: SportId,
    pub reason: String,
    /// True when the group gave up and will not reconnect.
    pub fatal: bool,
}

/// Trait for notification handlers.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - `notify` is called from pipeline workers and must return quickly;
///   spawn a task for slow I/O
pub trait Notifier: Send + Sync {
    /// Handle an event.
    fn notify(&self, event: Event);
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    /// Number of registered notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A logging notifier that emits events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::{info, warn};
        match event {
            Event::OpportunityDetected(opp) => {
                let legs: Vec<String> = opp
                    .legs
                    .iter()
                    .map(|l| format!("{}@{}:{}", l.selection, l.sportsbook, l.odds))
                    .collect();
                info!(
                    id = %opp.id,
                    kind = %opp.kind,
                    market = %opp.market,
                    edge = opp.edge,
                    legs = %legs.join(","),
                    book_version = opp.book_version,
                    guaranteed_return = ?opp.allocation.as_ref().map(|a| a.guaranteed_return),
                    supersedes = ?opp.supersedes,
                    "Opportunity detected"
                );
            }
            Event::OpportunityWithdrawn(e) => {
                info!(
                    id = %e.id,
                    kind = %e.kind,
                    market = %e.market,
                    book_version = e.book_version,
                    "Opportunity withdrawn"
                );
            }
            Event::GroupUnhealthy(e) => {
                warn!(
                    group = e.group,
                    sport = %e.sport,
                    fatal = e.fatal,
                    reason = %e.reason,
                    "Session group unhealthy"
                );
            }
            Event::GroupRecovered(e) => {
                info!(group = e.group, sport = %e.sport, "Session group recovered");
            }
        }
    }
}
