//! Infrastructure bootstrap helpers for runtime wiring.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::adapter::outbound::opticodds::catalog::OpticOddsCatalog;
use crate::adapter::outbound::opticodds::stream::OpticOddsFeed;
use crate::application::book::MarketBook;
use crate::application::catalog::CatalogStore;
use crate::application::detector::{DetectorSettings, OpportunityDetector};
use crate::application::normalize::{NormalizeRules, Normalizer};
use crate::application::pipeline::{Pipeline, PipelineSettings};
use crate::application::pricing::FairPriceEngine;
use crate::application::stats::PipelineStats;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::catalog::CatalogSource;
use crate::port::outbound::feed::{FeedFactory, OddsFeed};
use crate::port::outbound::notifier::{LogNotifier, NotifierRegistry};

/// Build notifier registry from configuration.
pub(crate) fn build_notifier_registry(_config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    registry
}

/// Catalog client for the configured provider.
///
/// # Errors
///
/// Returns an error if the API key is missing or the HTTP client cannot be
/// built.
pub(crate) fn build_catalog_source(config: &Config) -> Result<Arc<dyn CatalogSource>> {
    config.api_key()?;
    Ok(Arc::new(OpticOddsCatalog::new(config.feed.clone())?))
}

/// Factory producing one stream connection per session group.
///
/// # Errors
///
/// Returns an error if the API key is missing or the HTTP client cannot be
/// built.
pub(crate) fn build_feed_factory(config: &Config) -> Result<FeedFactory> {
    config.api_key()?;
    let feed_config = config.feed.clone();
    let client = OpticOddsFeed::client(&feed_config)?;
    Ok(Arc::new(move || {
        Box::new(OpticOddsFeed::with_client(client.clone(), feed_config.clone())) as Box<dyn OddsFeed>
    }))
}

/// Market book sized by the staleness window.
pub(crate) fn build_market_book(config: &Config) -> MarketBook {
    MarketBook::new(Duration::from_secs(config.book.staleness_secs))
}

/// Normalizer, pricing, detection and sharding wired from configuration.
pub(crate) fn build_pipeline(
    config: &Config,
    catalog: Arc<CatalogStore>,
    book: Arc<MarketBook>,
    notifiers: Arc<NotifierRegistry>,
    stats: Arc<PipelineStats>,
) -> Pipeline {
    let normalizer = Normalizer::new(
        config.sportsbooks.policy(),
        NormalizeRules {
            markets: config.filters.markets.clone(),
            leagues: config.filters.leagues.clone(),
            main_lines_only: config.filters.main_lines_only,
            exclude_live: config.filters.exclude_live,
        },
        Arc::clone(&stats),
    );
    let detection = &config.detection;
    let engine = FairPriceEngine::new(detection.min_reference_total, detection.max_reference_total);
    let detector = OpportunityDetector::new(DetectorSettings {
        ev_threshold: detection.ev_threshold,
        arb_safety_margin: detection.arb_safety_margin,
        edge_tolerance: detection.edge_tolerance,
    });
    let settings = PipelineSettings {
        workers: config.pipeline.workers,
        dispatchers: config.pipeline.dispatchers,
        worker_queue: config.pipeline.worker_queue,
        sweep_interval: Duration::from_secs(config.book.sweep_interval_secs),
        methods: detection.methods.clone(),
        benchmark: detection.benchmark,
        reference: detection.reference.clone(),
    };
    info!(
        workers = settings.workers,
        dispatchers = settings.dispatchers,
        reference = %settings.reference,
        benchmark = ?settings.benchmark,
        ev_threshold = detection.ev_threshold,
        arb_safety_margin = %detection.arb_safety_margin,
        "Pipeline configured"
    );
    Pipeline::new(settings, normalizer, catalog, book, engine, detector, notifiers, stats)
}
