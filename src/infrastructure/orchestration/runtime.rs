//! Orchestrator runtime lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::application::catalog::CatalogStore;
use crate::application::stats::{PipelineStats, StatsSnapshot};
use crate::error::Result;
use crate::infrastructure::bootstrap::{
    build_catalog_source, build_feed_factory, build_market_book, build_notifier_registry,
    build_pipeline,
};
use crate::infrastructure::catalog::{load_catalog, CatalogRefresher};
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::session::grouping::plan_groups;
use crate::infrastructure::session::health::GroupState;
use crate::infrastructure::session::manager::SessionManager;
use crate::port::outbound::catalog::CatalogSource;
use crate::port::outbound::feed::FeedFactory;
use crate::port::outbound::notifier::NotifierRegistry;

/// Adapters the runtime is wired with.
pub struct Components {
    pub catalog: Arc<dyn CatalogSource>,
    pub feeds: FeedFactory,
    pub notifiers: NotifierRegistry,
}

/// Runtime loop entrypoint used by [`Orchestrator`](super::orchestrator::Orchestrator).
///
/// # Errors
///
/// Returns startup failures; see [`run_with_components`].
pub async fn run_with_shutdown(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
    let components = Components {
        catalog: build_catalog_source(&config)?,
        feeds: build_feed_factory(&config)?,
        notifiers: build_notifier_registry(&config),
    };
    run_with_components(config, components, shutdown).await?;
    Ok(())
}

/// Run with explicit adapters until `shutdown` flips to true or closes.
///
/// Returns the final counters once every handed-off batch has drained.
///
/// # Errors
///
/// Returns an error when the initial catalog cannot be loaded or is empty.
pub async fn run_with_components(
    config: Config,
    components: Components,
    mut shutdown: watch::Receiver<bool>,
) -> Result<StatsSnapshot> {
    info!(
        workers = config.pipeline.workers,
        staleness_secs = config.book.staleness_secs,
        "Starting sharpline"
    );
    let Components {
        catalog: source,
        feeds,
        notifiers,
    } = components;

    let stats = Arc::new(PipelineStats::new());
    let notifiers = Arc::new(notifiers);
    info!(notifiers = notifiers.len(), "Notifiers initialized");

    let store = Arc::new(CatalogStore::new(load_catalog(source.as_ref()).await?));
    let book = Arc::new(build_market_book(&config));
    let pipeline = build_pipeline(
        &config,
        Arc::clone(&store),
        Arc::clone(&book),
        Arc::clone(&notifiers),
        Arc::clone(&stats),
    );

    let (tx, rx) = mpsc::channel(config.sessions.channel_capacity);
    let pipeline = pipeline.spawn(rx);

    let policy = config.sportsbooks.policy();
    let mut sessions = SessionManager::new(
        feeds,
        config.reconnection.clone(),
        &config.sessions,
        Arc::clone(&notifiers),
        Arc::clone(&stats),
    );
    let plan = plan_groups(
        &store.current(),
        &config.filters,
        &policy,
        config.sessions.max_leagues_per_group,
    );
    if plan.is_empty() {
        warn!("No active leagues match the configured filters");
    }
    sessions.start(plan, &tx);

    let (refreshed_tx, mut refreshed) = watch::channel(0u64);
    let refresher = (config.catalog.refresh_interval_secs > 0).then(|| {
        CatalogRefresher::new(
            source,
            Arc::clone(&store),
            Duration::from_secs(config.catalog.refresh_interval_secs),
        )
        .spawn(refreshed_tx)
    });

    let mut stats_interval =
        tokio::time::interval(Duration::from_secs(config.pipeline.stats_interval_secs));
    stats_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    stats_interval.tick().await;

    loop {
        tokio::select! {
            result = shutdown.changed() => {
                match result {
                    Ok(()) => {
                        if *shutdown.borrow() {
                            info!("Shutdown signal received");
                            break;
                        }
                    }
                    Err(_) => {
                        info!("Shutdown channel closed");
                        break;
                    }
                }
            }
            _ = stats_interval.tick() => {
                let snapshot = stats.snapshot();
                let health = sessions.health();
                info!(
                    batches = snapshot.batches,
                    applied = snapshot.updates_applied,
                    rejected = snapshot.updates_rejected,
                    stale = snapshot.stale_rejected,
                    dropped = snapshot.dropped,
                    evicted = snapshot.quotes_evicted,
                    emitted = snapshot.opportunities_emitted,
                    superseded = snapshot.opportunities_superseded,
                    withdrawn = snapshot.opportunities_withdrawn,
                    reconnects = snapshot.reconnects,
                    markets = book.len(),
                    groups_live = health.count(GroupState::Live),
                    groups_unhealthy = health.count(GroupState::Unhealthy),
                    groups_failed = health.count(GroupState::Failed),
                    "Pipeline stats"
                );
            }
            Ok(()) = refreshed.changed() => {
                let plan = plan_groups(
                    &store.current(),
                    &config.filters,
                    &policy,
                    config.sessions.max_leagues_per_group,
                );
                if plan.as_slice() != sessions.groups() {
                    info!(groups = plan.len(), "Catalog changed league coverage, regrouping sessions");
                    sessions.start(plan, &tx);
                }
            }
        }
    }

    if let Some(refresher) = refresher {
        refresher.abort();
    }
    sessions.teardown();
    drop(tx);
    pipeline.join().await;

    let snapshot = stats.snapshot();
    info!(
        applied = snapshot.updates_applied,
        emitted = snapshot.opportunities_emitted,
        withdrawn = snapshot.opportunities_withdrawn,
        "Shutdown complete"
    );
    Ok(snapshot)
}
