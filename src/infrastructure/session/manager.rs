//! One feed session per group.
//!
//! Every group runs in its own task: a [`ReconnectingFeed`] that hands each
//! batch to the pipeline with a [`BatchTicket`](crate::application::resume::BatchTicket).
//! A ticket is only issued once the pipeline queue has room for the batch.
//! Waiting for that room is the only backpressure the feed sees.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::grouping::SessionGroup;
use super::health::{GroupHealth, HealthRegistry};
use super::reconnecting::ReconnectingFeed;
use crate::application::pipeline::Delivery;
use crate::application::resume::ResumeCursor;
use crate::application::stats::PipelineStats;
use crate::infrastructure::config::stream::{ReconnectionConfig, SessionConfig};
use crate::port::outbound::feed::{FeedFactory, OddsFeed, Subscription};
use crate::port::outbound::notifier::NotifierRegistry;

/// Starts, tracks and tears down group sessions.
pub struct SessionManager {
    factory: FeedFactory,
    reconnection: ReconnectionConfig,
    idle_timeout: Duration,
    health: Arc<HealthRegistry>,
    notifiers: Arc<NotifierRegistry>,
    stats: Arc<PipelineStats>,
    /// Kept across restarts so an unchanged group resumes where it was.
    cursors: HashMap<Subscription, Arc<ResumeCursor>>,
    groups: Vec<SessionGroup>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        factory: FeedFactory,
        reconnection: ReconnectionConfig,
        sessions: &SessionConfig,
        notifiers: Arc<NotifierRegistry>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            factory,
            reconnection,
            idle_timeout: Duration::from_secs(sessions.idle_timeout_secs),
            health: Arc::new(HealthRegistry::new()),
            notifiers,
            stats,
            cursors: HashMap::new(),
            groups: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Start one task per group, replacing whatever was running.
    pub fn start(&mut self, groups: Vec<SessionGroup>, output: &mpsc::Sender<Delivery>) {
        self.teardown();
        self.cursors
            .retain(|subscription, _| groups.iter().any(|g| &g.subscription == subscription));

        for group in &groups {
            let cursor = Arc::clone(
                self.cursors
                    .entry(group.subscription.clone())
                    .or_insert_with(|| ResumeCursor::new(None)),
            );
            let health = GroupHealth::register(
                group.index,
                group.subscription.sport.clone(),
                group.subscription.leagues.len(),
                Arc::clone(&self.health),
                Arc::clone(&self.notifiers),
                Arc::clone(&self.stats),
            );
            let feed = ReconnectingFeed::new(
                (self.factory)(),
                group.subscription.clone(),
                Arc::clone(&cursor),
                health,
                self.reconnection.clone(),
                self.idle_timeout,
            );
            self.tasks
                .push(tokio::spawn(run_group(group.index, feed, cursor, output.clone())));
        }

        info!(groups = groups.len(), "Session groups started");
        self.groups = groups;
    }

    /// Abort every group task.
    ///
    /// Backoff timers and in-flight connections are cancelled at once;
    /// batches already handed to the pipeline still drain.
    pub fn teardown(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.health.clear();
        debug!(groups = self.groups.len(), "Session groups torn down");
    }

    /// Groups of the current plan.
    #[must_use]
    pub fn groups(&self) -> &[SessionGroup] {
        &self.groups
    }

    /// Group tasks that have not exited.
    #[must_use]
    pub fn running(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    #[must_use]
    pub fn health(&self) -> &Arc<HealthRegistry> {
        &self.health
    }

    /// Resume cursor of a subscription in the current plan.
    #[must_use]
    pub fn cursor(&self, subscription: &Subscription) -> Option<Arc<ResumeCursor>> {
        self.cursors.get(subscription).cloned()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn run_group(
    group: usize,
    mut feed: ReconnectingFeed<Box<dyn OddsFeed>>,
    cursor: Arc<ResumeCursor>,
    output: mpsc::Sender<Delivery>,
) {
    loop {
        let batch = match feed.next_batch().await {
            Ok(batch) => batch,
            Err(e) => {
                error!(group, error = %e, "Session group stopped");
                return;
            }
        };
        // Wait for room before issuing, so an abort while the queue is full
        // loses the batch without acknowledging it.
        let Ok(permit) = output.reserve().await else {
            debug!(group, "Pipeline closed, session group exiting");
            return;
        };
        let ticket = cursor.issue(batch.position.clone());
        permit.send(Delivery {
            group,
            batch,
            ticket,
        });
    }
}
