//! Connection health of session groups.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::application::stats::PipelineStats;
use crate::domain::id::SportId;
use crate::port::outbound::notifier::{Event, GroupHealthEvent, NotifierRegistry};

/// Lifecycle state of one group's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupState {
    Connecting,
    Live,
    /// Waiting out a reconnect delay.
    Backoff,
    /// Retry budget exhausted; waiting for the circuit breaker cooldown.
    Unhealthy,
    /// Fatal error; the group will not reconnect.
    Failed,
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Live => "live",
            Self::Backoff => "backoff",
            Self::Unhealthy => "unhealthy",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Last known status of a group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStatus {
    pub sport: SportId,
    pub leagues: usize,
    pub state: GroupState,
    pub since: DateTime<Utc>,
    pub reconnects: u64,
}

/// Shared table of group states, keyed by group index.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    groups: DashMap<usize, GroupStatus>,
}

impl HealthRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of one group.
    #[must_use]
    pub fn status(&self, group: usize) -> Option<GroupStatus> {
        self.groups.get(&group).map(|s| s.clone())
    }

    /// All groups sorted by index.
    #[must_use]
    pub fn all(&self) -> Vec<(usize, GroupStatus)> {
        let mut all: Vec<_> = self
            .groups
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        all.sort_by_key(|(group, _)| *group);
        all
    }

    /// Number of groups in `state`.
    #[must_use]
    pub fn count(&self, state: GroupState) -> usize {
        self.groups.iter().filter(|e| e.state == state).count()
    }

    /// Forget every group.
    pub fn clear(&self) {
        self.groups.clear();
    }

    fn register(&self, group: usize, sport: SportId, leagues: usize) {
        self.groups.insert(
            group,
            GroupStatus {
                sport,
                leagues,
                state: GroupState::Connecting,
                since: Utc::now(),
                reconnects: 0,
            },
        );
    }

    fn transition(&self, group: usize, state: GroupState) -> Option<GroupState> {
        let mut status = self.groups.get_mut(&group)?;
        let previous = status.state;
        if previous != state {
            status.state = state;
            status.since = Utc::now();
        }
        Some(previous)
    }

    fn bump_reconnects(&self, group: usize) {
        if let Some(mut status) = self.groups.get_mut(&group) {
            status.reconnects += 1;
        }
    }
}

/// Health reporting handle owned by one group's session.
pub struct GroupHealth {
    group: usize,
    sport: SportId,
    /// Unhealthy was announced and recovery has not been yet.
    announced: bool,
    registry: Arc<HealthRegistry>,
    notifiers: Arc<NotifierRegistry>,
    stats: Arc<PipelineStats>,
}

impl GroupHealth {
    /// Register `group` as connecting and return its handle.
    #[must_use]
    pub fn register(
        group: usize,
        sport: SportId,
        leagues: usize,
        registry: Arc<HealthRegistry>,
        notifiers: Arc<NotifierRegistry>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        registry.register(group, sport.clone(), leagues);
        Self {
            group,
            sport,
            announced: false,
            registry,
            notifiers,
            stats,
        }
    }

    #[must_use]
    pub const fn group(&self) -> usize {
        self.group
    }

    #[must_use]
    pub fn sport(&self) -> &SportId {
        &self.sport
    }

    pub fn connecting(&self) {
        self.set(GroupState::Connecting);
    }

    pub fn backoff(&self) {
        self.registry.bump_reconnects(self.group);
        self.stats.record_reconnect();
        self.set(GroupState::Backoff);
    }

    /// Mark the group live, announcing recovery if it had been unhealthy.
    pub fn live(&mut self) {
        self.set(GroupState::Live);
        if self.announced {
            self.announced = false;
            self.notifiers.notify_all(Event::GroupRecovered(self.event("", false)));
        }
    }

    /// Announced once per outage, however many cooldowns it spans.
    pub fn unhealthy(&mut self, reason: &str) {
        self.set(GroupState::Unhealthy);
        if !self.announced {
            self.announced = true;
            self.notifiers.notify_all(Event::GroupUnhealthy(self.event(reason, false)));
        }
    }

    pub fn failed(&mut self, reason: &str) {
        self.set(GroupState::Failed);
        self.notifiers.notify_all(Event::GroupUnhealthy(self.event(reason, true)));
    }

    fn set(&self, state: GroupState) -> Option<GroupState> {
        let previous = self.registry.transition(self.group, state);
        if previous != Some(state) {
            debug!(group = self.group, sport = %self.sport, %state, "Group state changed");
        }
        previous
    }

    fn event(&self, reason: &str, fatal: bool) -> GroupHealthEvent {
        GroupHealthEvent {
            group: self.group,
            sport: self.sport.clone(),
            reason: reason.to_string(),
            fatal,
        }
    }
}
