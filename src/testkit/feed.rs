//! Mock [`OddsFeed`] implementations for testing.
//!
//! - [`ScriptedFeed`]: Pre-loaded connect results and events.
//!   Best for: error handling, reconnection logic, resume behavior.
//!
//! - [`ChannelFeed`]: Channel-backed feed with external control handle.
//!   Best for: integration tests needing precise, on-demand event delivery.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::id::EventPosition;
use crate::error::Result;
use crate::port::outbound::feed::{FeedEvent, OddsBatch, OddsFeed, Subscription};

type Resumes = Arc<Mutex<Vec<Option<EventPosition>>>>;

// ---------------------------------------------------------------------------
// ScriptedFeed
// ---------------------------------------------------------------------------

/// A mock feed with scripted connect results and a fixed event queue.
///
/// Each call to `connect()` pops the next result (defaults to `Ok(())` when
/// exhausted). Once the events run out the feed reports end of stream, or
/// stays silent forever after [`silent_after_events`](Self::silent_after_events).
pub struct ScriptedFeed {
    connect_results: VecDeque<Result<()>>,
    events: VecDeque<Option<FeedEvent>>,
    silent: bool,
    connects: Arc<AtomicU32>,
    resumes: Resumes,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self {
            connect_results: VecDeque::new(),
            events: VecDeque::new(),
            silent: false,
            connects: Arc::new(AtomicU32::new(0)),
            resumes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_connect_results(mut self, results: Vec<Result<()>>) -> Self {
        self.connect_results = results.into();
        self
    }

    pub fn with_events(mut self, events: Vec<Option<FeedEvent>>) -> Self {
        self.events = events.into();
        self
    }

    /// Block instead of ending once the scripted events are used up.
    pub fn silent_after_events(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Shared counter of `connect()` calls.
    pub fn connects(&self) -> Arc<AtomicU32> {
        self.connects.clone()
    }

    /// Resume positions passed to each `connect()`, in order.
    pub fn resumes(&self) -> Resumes {
        self.resumes.clone()
    }
}

impl Default for ScriptedFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OddsFeed for ScriptedFeed {
    async fn connect(
        &mut self,
        _subscription: &Subscription,
        resume_from: Option<&EventPosition>,
    ) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.resumes.lock().push(resume_from.cloned());
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    async fn next_event(&mut self) -> Option<FeedEvent> {
        match self.events.pop_front() {
            Some(event) => event,
            None if self.silent => std::future::pending().await,
            None => None,
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// ChannelFeed
// ---------------------------------------------------------------------------

/// A mock feed controlled externally via a [`ChannelFeedHandle`].
///
/// Events sent into the handle are read by `next_event()`. No real network
/// I/O.
pub struct ChannelFeed {
    event_rx: tokio::sync::mpsc::Receiver<Option<FeedEvent>>,
    connects: Arc<AtomicU32>,
    resumes: Resumes,
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

/// Control handle for a [`ChannelFeed`].
pub struct ChannelFeedHandle {
    event_tx: tokio::sync::mpsc::Sender<Option<FeedEvent>>,
    connects: Arc<AtomicU32>,
    resumes: Resumes,
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

impl ChannelFeedHandle {
    /// Send an event to the feed.
    pub async fn send(&self, event: FeedEvent) {
        let _ = self.event_tx.send(Some(event)).await;
    }

    /// Send a batch to the feed.
    pub async fn send_batch(&self, batch: OddsBatch) {
        self.send(FeedEvent::Batch(batch)).await;
    }

    /// Signal end-of-stream (causes `next_event` to return `None`).
    pub async fn close(&self) {
        let _ = self.event_tx.send(None).await;
    }

    /// How many times `connect()` was called.
    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    /// Resume positions passed to each `connect()`, in order.
    pub fn resumes(&self) -> Vec<Option<EventPosition>> {
        self.resumes.lock().clone()
    }

    /// Subscriptions passed to each `connect()`, in order.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.lock().clone()
    }
}

/// Create a [`ChannelFeed`] and its control [`ChannelFeedHandle`].
pub fn channel_feed(buffer: usize) -> (ChannelFeed, ChannelFeedHandle) {
    let (tx, rx) = tokio::sync::mpsc::channel(buffer);
    let connects = Arc::new(AtomicU32::new(0));
    let resumes: Resumes = Arc::new(Mutex::new(Vec::new()));
    let subscriptions = Arc::new(Mutex::new(Vec::new()));
    (
        ChannelFeed {
            event_rx: rx,
            connects: connects.clone(),
            resumes: resumes.clone(),
            subscriptions: subscriptions.clone(),
        },
        ChannelFeedHandle {
            event_tx: tx,
            connects,
            resumes,
            subscriptions,
        },
    )
}

#[async_trait]
impl OddsFeed for ChannelFeed {
    async fn connect(
        &mut self,
        subscription: &Subscription,
        resume_from: Option<&EventPosition>,
    ) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.resumes.lock().push(resume_from.cloned());
        self.subscriptions.lock().push(subscription.clone());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<FeedEvent> {
        match self.event_rx.recv().await {
            Some(Some(event)) => Some(event),
            Some(None) | None => None,
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
