//! Sharded processing pipeline.
//!
//! A router hands each delivered batch to one of several dispatchers, chosen
//! by session group so a group's batches stay in stream order. Dispatchers
//! normalize against the current catalog and route each update to the worker
//! owning its market. Workers are the only writers of their markets: they
//! apply updates, price the resulting snapshot, detect and reconcile
//! opportunities, and sweep their own markets for stale quotes.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::book::{BookRejection, MarketBook};
use super::catalog::CatalogStore;
use super::detector::{LedgerEvent, OpportunityDetector, OpportunityLedger};
use super::normalize::Normalizer;
use super::pricing::FairPriceEngine;
use super::resume::BatchTicket;
use super::stats::PipelineStats;
use crate::domain::book::MarketBookEntry;
use crate::domain::fair::{DevigMethod, ReferenceSource};
use crate::domain::id::MarketId;
use crate::domain::quote::QuoteUpdate;
use crate::port::outbound::feed::OddsBatch;
use crate::port::outbound::notifier::{Event, NotifierRegistry};

/// A batch handed from a session group to the pipeline.
#[derive(Debug)]
pub struct Delivery {
    pub group: usize,
    pub batch: OddsBatch,
    /// Marked done by the dispatcher and by every job it spawns.
    pub ticket: BatchTicket,
}

/// Pipeline sizing and pricing choices.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub workers: usize,
    /// Normalizing dispatcher tasks.
    pub dispatchers: usize,
    /// Bounded queue depth per worker.
    pub worker_queue: usize,
    pub sweep_interval: Duration,
    /// Every method to compute per evaluation.
    pub methods: Vec<DevigMethod>,
    /// Method whose estimate drives EV detection.
    pub benchmark: DevigMethod,
    pub reference: ReferenceSource,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            dispatchers: 2,
            worker_queue: 4096,
            sweep_interval: Duration::from_secs(10),
            methods: vec![DevigMethod::Multiplicative, DevigMethod::Power],
            benchmark: DevigMethod::Multiplicative,
            reference: ReferenceSource::BestPrice,
        }
    }
}

/// Worker index owning `market` out of `shards`.
#[must_use]
pub fn shard_for(market: &MarketId, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    market.hash(&mut hasher);
    (hasher.finish() % shards.max(1) as u64) as usize
}

enum Job {
    Apply {
        update: QuoteUpdate,
        ticket: BatchTicket,
    },
    Sweep(DateTime<Utc>),
}

/// Everything the pipeline shares with its tasks.
pub struct Pipeline {
    settings: PipelineSettings,
    normalizer: Normalizer,
    catalog: Arc<CatalogStore>,
    book: Arc<MarketBook>,
    engine: FairPriceEngine,
    detector: OpportunityDetector,
    notifiers: Arc<NotifierRegistry>,
    stats: Arc<PipelineStats>,
}

impl Pipeline {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: PipelineSettings,
        normalizer: Normalizer,
        catalog: Arc<CatalogStore>,
        book: Arc<MarketBook>,
        engine: FairPriceEngine,
        detector: OpportunityDetector,
        notifiers: Arc<NotifierRegistry>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            settings,
            normalizer,
            catalog,
            book,
            engine,
            detector,
            notifiers,
            stats,
        }
    }

    /// Start the router, dispatchers and workers.
    ///
    /// The pipeline drains and stops once every sender of `input` is dropped.
    #[must_use]
    pub fn spawn(self, input: mpsc::Receiver<Delivery>) -> PipelineHandle {
        let shards = self.settings.workers.max(1);
        let queue = self.settings.worker_queue.max(1);
        let mut senders = Vec::with_capacity(shards);
        let mut workers = Vec::with_capacity(shards);

        for index in 0..shards {
            let (tx, rx) = mpsc::channel(queue);
            senders.push(tx);
            let worker = Worker {
                index,
                shards,
                book: Arc::clone(&self.book),
                engine: self.engine.clone(),
                detector: self.detector.clone(),
                ledger: OpportunityLedger::new(self.detector.settings().edge_tolerance),
                expiries: HashMap::new(),
                methods: self.settings.methods.clone(),
                benchmark: self.settings.benchmark,
                reference: self.settings.reference.clone(),
                notifiers: Arc::clone(&self.notifiers),
                stats: Arc::clone(&self.stats),
            };
            workers.push(tokio::spawn(worker.run(rx)));
        }

        let normalizer = Arc::new(self.normalizer);
        let count = self.settings.dispatchers.max(1);
        let mut lanes = Vec::with_capacity(count);
        let mut dispatchers = Vec::with_capacity(count);
        for index in 0..count {
            let (tx, rx) = mpsc::channel(queue);
            lanes.push(tx);
            let dispatcher = Dispatcher {
                index,
                senders: senders.clone(),
                normalizer: Arc::clone(&normalizer),
                catalog: Arc::clone(&self.catalog),
                stats: Arc::clone(&self.stats),
            };
            dispatchers.push(tokio::spawn(dispatcher.run(rx)));
        }

        let router = Router {
            lanes,
            workers: senders,
            sweep_interval: self.settings.sweep_interval,
        };
        info!(workers = shards, dispatchers = count, "Pipeline started");

        PipelineHandle {
            router: tokio::spawn(router.run(input)),
            dispatchers,
            workers,
        }
    }
}

/// Join handles of a running pipeline.
pub struct PipelineHandle {
    router: JoinHandle<()>,
    dispatchers: Vec<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Wait for the router, dispatchers and workers to finish draining.
    pub async fn join(self) {
        if let Err(e) = self.router.await {
            warn!(error = %e, "Pipeline router panicked");
        }
        for dispatcher in self.dispatchers {
            if let Err(e) = dispatcher.await {
                warn!(error = %e, "Pipeline dispatcher panicked");
            }
        }
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Pipeline worker panicked");
            }
        }
    }

    /// Stop without draining. Batches still queued are abandoned.
    pub fn abort(&self) {
        self.router.abort();
        for task in self.dispatchers.iter().chain(&self.workers) {
            task.abort();
        }
    }
}

/// Dispatcher lane for a session group.
#[must_use]
pub fn lane_for(group: usize, lanes: usize) -> usize {
    group % lanes.max(1)
}

/// Fans deliveries out to dispatchers and drives the sweep clock.
struct Router {
    lanes: Vec<mpsc::Sender<Delivery>>,
    workers: Vec<mpsc::Sender<Job>>,
    sweep_interval: Duration,
}

impl Router {
    async fn run(self, mut input: mpsc::Receiver<Delivery>) {
        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        sweep.tick().await;

        loop {
            tokio::select! {
                delivery = input.recv() => {
                    let Some(delivery) = delivery else {
                        break;
                    };
                    let lane = lane_for(delivery.group, self.lanes.len());
                    if self.lanes[lane].send(delivery).await.is_err() {
                        warn!(lane, "Pipeline dispatcher gone, stopping router");
                        return;
                    }
                }
                _ = sweep.tick() => {
                    let now = Utc::now();
                    for tx in &self.workers {
                        if tx.send(Job::Sweep(now)).await.is_err() {
                            warn!("Pipeline worker gone, stopping router");
                            return;
                        }
                    }
                }
            }
        }
        debug!("Pipeline input closed, draining dispatchers");
    }
}

struct Dispatcher {
    index: usize,
    senders: Vec<mpsc::Sender<Job>>,
    normalizer: Arc<Normalizer>,
    catalog: Arc<CatalogStore>,
    stats: Arc<PipelineStats>,
}

impl Dispatcher {
    async fn run(self, mut input: mpsc::Receiver<Delivery>) {
        while let Some(delivery) = input.recv().await {
            if !self.dispatch(delivery).await {
                return;
            }
        }
        debug!(dispatcher = self.index, "Pipeline dispatcher stopped");
    }

    /// Route one batch. Returns false once a worker has gone away.
    async fn dispatch(&self, delivery: Delivery) -> bool {
        let Delivery {
            group,
            batch,
            ticket,
        } = delivery;
        self.stats.record_batch(batch.malformed);
        let catalog = self.catalog.current();
        trace!(
            dispatcher = self.index,
            group,
            seq = ticket.seq(),
            events = batch.events.len(),
            "Dispatching batch"
        );

        for raw in &batch.events {
            let Some(update) = self.normalizer.normalize(raw, &catalog) else {
                continue;
            };
            let shard = shard_for(update.market(), self.senders.len());
            let job = Job::Apply {
                update,
                ticket: ticket.clone(),
            };
            if self.senders[shard].send(job).await.is_err() {
                warn!(shard, "Pipeline worker gone, stopping dispatcher");
                return false;
            }
        }
        ticket.done();
        true
    }
}

struct Worker {
    index: usize,
    shards: usize,
    book: Arc<MarketBook>,
    engine: FairPriceEngine,
    detector: OpportunityDetector,
    ledger: OpportunityLedger,
    /// When the oldest quote behind a market's standing opportunities goes
    /// stale. The market is re-evaluated then instead of at the next sweep.
    expiries: HashMap<MarketId, DateTime<Utc>>,
    methods: Vec<DevigMethod>,
    benchmark: DevigMethod,
    reference: ReferenceSource,
    notifiers: Arc<NotifierRegistry>,
    stats: Arc<PipelineStats>,
}

impl Worker {
    async fn run(mut self, mut jobs: mpsc::Receiver<Job>) {
        loop {
            let wake = self.next_expiry();
            let expiry = async move {
                match wake {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                job = jobs.recv() => match job {
                    Some(Job::Apply { update, ticket }) => {
                        self.apply(update, Utc::now());
                        ticket.done();
                    }
                    Some(Job::Sweep(now)) => self.sweep(now),
                    None => break,
                },
                () = expiry => self.expire(Utc::now()),
            }
        }
        debug!(worker = self.index, "Pipeline worker stopped");
    }

    fn next_expiry(&self) -> Option<Instant> {
        let earliest = self.expiries.values().min()?;
        let wait = (*earliest - Utc::now()).to_std().unwrap_or_default();
        // Eviction drops quotes strictly older than the window.
        Some(Instant::now() + wait + Duration::from_millis(1))
    }

    /// Re-evaluate markets whose oldest backing quote has gone stale.
    fn expire(&mut self, now: DateTime<Utc>) {
        let due: Vec<MarketId> = self
            .expiries
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(market, _)| market.clone())
            .collect();
        for market in due {
            self.expiries.remove(&market);
            if let Some((snapshot, evicted)) = self.book.refresh(&market, now) {
                self.stats.record_evicted(evicted);
                trace!(market = %market, evicted, "Quotes behind opportunities expired");
                self.evaluate(&snapshot);
            }
        }
    }

    fn apply(&mut self, update: QuoteUpdate, now: DateTime<Utc>) {
        let outcome = self.book.apply(update, now);
        self.stats.record_evicted(outcome.evicted);
        match outcome.rejection {
            None => self.stats.record_applied(),
            Some(BookRejection::NotNewer) => self.stats.record_rejected(),
            Some(BookRejection::Stale) => self.stats.record_stale(),
        }
        if outcome.changed || outcome.evicted > 0 {
            self.evaluate(&outcome.snapshot);
        }
    }

    fn sweep(&mut self, now: DateTime<Utc>) {
        let (index, shards) = (self.index, self.shards);
        let report = self
            .book
            .sweep_where(now, |market| shard_for(market, shards) == index);
        self.stats.record_evicted(report.evicted);
        for snapshot in &report.changed {
            self.evaluate(snapshot);
        }
        for market in &report.removed {
            self.ledger.forget(market);
            self.expiries.remove(market);
        }
    }

    fn evaluate(&mut self, snapshot: &MarketBookEntry) {
        let estimates = self
            .engine
            .estimate_all(snapshot, &self.methods, &self.reference);
        for estimate in &estimates {
            trace!(
                market = %estimate.market,
                method = ?estimate.method,
                version = estimate.book_version,
                probabilities = ?estimate.probabilities,
                "Fair price"
            );
        }
        let benchmark = estimates.iter().find(|e| e.method == self.benchmark);
        let found = self.detector.evaluate(snapshot, benchmark);

        for event in self
            .ledger
            .reconcile(snapshot.market(), snapshot.version(), found)
        {
            match event {
                LedgerEvent::Emitted(opportunity) => {
                    self.stats
                        .record_emitted(opportunity.supersedes.is_some());
                    self.notifiers
                        .notify_all(Event::OpportunityDetected(Arc::new(opportunity)));
                }
                LedgerEvent::Withdrawn(withdrawn) => {
                    self.stats.record_withdrawn();
                    self.notifiers
                        .notify_all(Event::OpportunityWithdrawn(withdrawn));
                }
            }
        }

        let expiry = (self.ledger.active(snapshot.market()) > 0)
            .then(|| self.book.expires_at(snapshot))
            .flatten();
        match expiry {
            Some(at) => self.expiries.insert(snapshot.market().clone(), at),
            None => self.expiries.remove(snapshot.market()),
        };
    }
}
