mod harness;
mod support;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use harness::recording_notifier::RecordingNotifier;
use sharpline::application::book::MarketBook;
use sharpline::application::catalog::CatalogStore;
use sharpline::application::detector::OpportunityDetector;
use sharpline::application::normalize::{NormalizeRules, Normalizer};
use sharpline::application::pipeline::{Delivery, Pipeline, PipelineHandle};
use sharpline::application::pricing::FairPriceEngine;
use sharpline::application::resume::ResumeCursor;
use sharpline::application::stats::PipelineStats;
use sharpline::domain::catalog::{BookPolicy, SportsbookPolicy};
use sharpline::domain::id::MarketId;
use sharpline::domain::opportunity::OpportunityKind;
use sharpline::port::outbound::feed::OddsBatch;
use sharpline::port::outbound::notifier::NotifierRegistry;
use sharpline::testkit;
use sharpline::testkit::domain::{batch, raw_locked, raw_odds};

const WAIT: Duration = Duration::from_secs(2);

struct Harness {
    tx: mpsc::Sender<Delivery>,
    handle: PipelineHandle,
    book: Arc<MarketBook>,
    stats: Arc<PipelineStats>,
    notifier: RecordingNotifier,
    cursor: Arc<ResumeCursor>,
}

impl Harness {
    fn start(workers: usize) -> Self {
        Self::with_staleness(workers, Duration::from_secs(30))
    }

    fn with_staleness(workers: usize, staleness: Duration) -> Self {
        let stats = Arc::new(PipelineStats::new());
        let book = Arc::new(MarketBook::new(staleness));
        let notifier = RecordingNotifier::new();
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(notifier.clone()));

        let pipeline = Pipeline::new(
            testkit::config::pipeline(workers),
            Normalizer::new(
                SportsbookPolicy::new(BookPolicy::Included),
                NormalizeRules {
                    main_lines_only: true,
                    ..NormalizeRules::default()
                },
                Arc::clone(&stats),
            ),
            Arc::new(CatalogStore::new(testkit::domain::catalog())),
            Arc::clone(&book),
            FairPriceEngine::new(0.6, 2.0),
            OpportunityDetector::default(),
            Arc::new(registry),
            Arc::clone(&stats),
        );
        let (tx, rx) = mpsc::channel(16);
        Self {
            tx,
            handle: pipeline.spawn(rx),
            book,
            stats,
            notifier,
            cursor: ResumeCursor::new(None),
        }
    }

    async fn deliver(&self, batch: OddsBatch) {
        self.deliver_from(0, batch).await;
    }

    async fn deliver_from(&self, group: usize, batch: OddsBatch) {
        let ticket = self.cursor.issue(batch.position.clone());
        self.tx
            .send(Delivery {
                group,
                batch,
                ticket,
            })
            .await
            .unwrap();
    }

    async fn shutdown(self) -> (Arc<PipelineStats>, RecordingNotifier, Arc<ResumeCursor>) {
        drop(self.tx);
        self.handle.join().await;
        (self.stats, self.notifier, self.cursor)
    }
}

#[tokio::test]
async fn arbitrage_across_books_is_emitted_once() {
    let harness = Harness::start(2);
    harness
        .deliver(batch(
            "1-0",
            vec![
                raw_odds("pinnacle", "f1", "Moneyline", "Home", "2.50", 1),
                raw_odds("draftkings", "f1", "Moneyline", "Away", "2.50", 2),
            ],
        ))
        .await;
    // The same prices again carry no new information.
    harness
        .deliver(batch(
            "2-0",
            vec![
                raw_odds("pinnacle", "f1", "Moneyline", "Home", "2.50", 1),
                raw_odds("draftkings", "f1", "Moneyline", "Away", "2.50", 2),
            ],
        ))
        .await;

    let (stats, notifier, cursor) = harness.shutdown().await;
    let arbs = notifier.of_kind(OpportunityKind::Arbitrage);
    assert_eq!(arbs.len(), 1);
    assert_eq!(arbs[0].market, MarketId::from("f1:moneyline"));
    let allocation = arbs[0].allocation.as_ref().unwrap();
    assert_eq!(allocation.fractions.len(), 2);

    let snap = stats.snapshot();
    assert_eq!(snap.batches, 2);
    assert_eq!(snap.updates_applied, 2);
    assert_eq!(snap.updates_rejected, 2);
    assert_eq!(cursor.acknowledged().unwrap().as_str(), "2-0");
    assert_eq!(cursor.in_flight(), 0);
}

#[tokio::test]
async fn suspension_withdraws_the_opportunity() {
    let harness = Harness::start(1);
    harness
        .deliver(batch(
            "1-0",
            vec![
                raw_odds("pinnacle", "f1", "Moneyline", "Home", "2.50", 1),
                raw_odds("draftkings", "f1", "Moneyline", "Away", "2.50", 2),
            ],
        ))
        .await;
    harness
        .deliver(batch(
            "2-0",
            vec![raw_locked("draftkings", "f1", "Moneyline", "Away", 3)],
        ))
        .await;

    let (_, notifier, _) = harness.shutdown().await;
    // Both legs are also +EV against the best-price fair line.
    assert_eq!(notifier.of_kind(OpportunityKind::Arbitrage).len(), 1);
    assert_eq!(notifier.of_kind(OpportunityKind::Ev).len(), 2);

    let withdrawn = notifier.withdrawals();
    assert_eq!(withdrawn.len(), 3);
    assert_eq!(
        withdrawn
            .iter()
            .filter(|w| w.kind == OpportunityKind::Arbitrage)
            .count(),
        1
    );
    assert!(withdrawn.iter().all(|w| w.book_version == 3));
}

#[tokio::test]
async fn malformed_and_unknown_events_are_counted_and_skipped() {
    let harness = Harness::start(2);
    let mut unknown_league = raw_odds("pinnacle", "f2", "Moneyline", "Home", "2.00", 5);
    unknown_league.league = Some("serie_a".into());
    let bad_price = raw_odds("pinnacle", "f2", "Moneyline", "Home", "abc", 6);
    let mut missing_book = raw_odds("pinnacle", "f2", "Moneyline", "Home", "2.00", 7);
    missing_book.sportsbook = None;

    let mut odds = batch(
        "1-0",
        vec![
            unknown_league,
            bad_price,
            missing_book,
            raw_odds("pinnacle", "f2", "Moneyline", "Home", "2.00", 8),
        ],
    );
    odds.malformed = 1;
    harness.deliver(odds).await;

    let book = Arc::clone(&harness.book);
    let (stats, notifier, _) = harness.shutdown().await;
    let snap = stats.snapshot();
    assert_eq!(snap.malformed, 1);
    assert_eq!(snap.dropped, 3);
    assert_eq!(snap.updates_applied, 1);
    assert!(book.contains(&MarketId::from("f2:moneyline")));
    assert!(notifier.opportunities().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn markets_on_different_workers_are_all_processed() {
    let harness = Harness::start(4);
    for i in 0..20u64 {
        let fixture = format!("fx{i}");
        harness
            .deliver(batch(
                &format!("{i}-0"),
                vec![
                    raw_odds("pinnacle", &fixture, "Moneyline", "Home", "1.90", i * 2 + 1),
                    raw_odds("draftkings", &fixture, "Moneyline", "Away", "1.90", i * 2 + 2),
                ],
            ))
            .await;
    }

    let book = Arc::clone(&harness.book);
    let (stats, notifier, cursor) = harness.shutdown().await;
    assert_eq!(book.len(), 20);
    assert_eq!(stats.snapshot().updates_applied, 40);
    assert!(notifier.opportunities().is_empty());
    assert_eq!(cursor.acknowledged().unwrap().as_str(), "19-0");
}

#[tokio::test]
async fn cursor_waits_for_every_update_of_a_batch() {
    let harness = Harness::start(2);
    let earlier = harness.cursor.issue(None);
    harness
        .deliver(batch(
            "1-0",
            vec![raw_odds("pinnacle", "f1", "Moneyline", "Home", "2.00", 1)],
        ))
        .await;
    assert!(
        harness
            .notifier
            .wait_for(WAIT, |_| harness.stats.snapshot().updates_applied == 1)
            .await
    );
    // An earlier ticket is still open, so nothing can be acknowledged yet.
    assert!(harness.cursor.acknowledged().is_none());

    earlier.done();
    assert_eq!(harness.cursor.acknowledged().unwrap().as_str(), "1-0");
    harness.shutdown().await;
}

#[tokio::test]
async fn aborted_pipeline_does_not_acknowledge_queued_batches() {
    let harness = Harness::start(2);
    harness
        .deliver(batch(
            "1-0",
            vec![raw_odds("pinnacle", "f1", "Moneyline", "Home", "2.00", 1)],
        ))
        .await;
    harness.handle.abort();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(harness.stats.snapshot().updates_applied, 0);
    assert!(harness.cursor.acknowledged().is_none());
    assert!(harness.cursor.is_stalled());
}

#[tokio::test]
async fn groups_are_normalized_on_separate_dispatchers() {
    let harness = Harness::start(3);
    for i in 0..6u64 {
        harness
            .deliver_from(
                (i % 2) as usize,
                batch(
                    &format!("{i}-0"),
                    vec![raw_odds("pinnacle", &format!("g{i}"), "Moneyline", "Home", "1.90", i + 1)],
                ),
            )
            .await;
    }
    let (stats, _, cursor) = harness.shutdown().await;

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.batches, 6);
    assert_eq!(snapshot.updates_applied, 6);
    assert_eq!(cursor.acknowledged().unwrap().as_str(), "5-0");
    assert_eq!(cursor.in_flight(), 0);
}

#[tokio::test]
async fn opportunity_is_withdrawn_when_its_quotes_expire_without_updates() {
    // Sweeps are an hour apart in the test preset, so only expiry tracking
    // can withdraw this in time.
    let harness = Harness::with_staleness(2, Duration::from_millis(150));
    harness
        .deliver(batch(
            "1-0",
            vec![
                raw_odds("pinnacle", "f1", "Moneyline", "Home", "2.50", 1),
                raw_odds("draftkings", "f1", "Moneyline", "Away", "2.50", 2),
            ],
        ))
        .await;
    assert!(
        harness
            .notifier
            .wait_for(WAIT, |n| !n.of_kind(OpportunityKind::Arbitrage).is_empty())
            .await
    );
    let emitted = harness.notifier.opportunities().len();

    assert!(
        harness
            .notifier
            .wait_for(WAIT, |n| n.withdrawals().len() == emitted)
            .await
    );
    assert!(harness.stats.snapshot().quotes_evicted >= 1);
    let (_, notifier, _) = harness.shutdown().await;
    assert_eq!(notifier.opportunities().len(), emitted);
}
