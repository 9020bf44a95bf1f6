//! Catalog loading and background refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::application::catalog::CatalogStore;
use crate::domain::catalog::Catalog;
use crate::error::Result;
use crate::port::outbound::catalog::CatalogSource;

/// Fetch a full catalog snapshot.
///
/// # Errors
///
/// Returns the source error, or [`DomainError::EmptyCatalog`](crate::domain::error::DomainError::EmptyCatalog)
/// when the source returned nothing.
pub async fn load_catalog(source: &dyn CatalogSource) -> Result<Catalog> {
    let entries = source.fetch_entries().await?;
    let catalog = Catalog::from_entries(entries)?;
    info!(
        entries = catalog.len(),
        sports = catalog.active_leagues_by_sport().len(),
        "Catalog loaded"
    );
    Ok(catalog)
}

/// Periodically reloads the catalog into a [`CatalogStore`].
pub struct CatalogRefresher {
    source: Arc<dyn CatalogSource>,
    store: Arc<CatalogStore>,
    interval: Duration,
}

impl CatalogRefresher {
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>, store: Arc<CatalogStore>, interval: Duration) -> Self {
        Self {
            source,
            store,
            interval,
        }
    }

    /// Start refreshing. `refreshed` is bumped after every successful swap.
    ///
    /// A failed refresh keeps the previous snapshot.
    #[must_use]
    pub fn spawn(self, refreshed: watch::Sender<u64>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; startup already loaded.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match load_catalog(self.source.as_ref()).await {
                    Ok(catalog) => {
                        self.store.replace(catalog);
                        refreshed.send_modify(|n| *n += 1);
                    }
                    Err(e) => warn!(error = %e, "Catalog refresh failed, keeping previous snapshot"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CatalogEntry, Category};
    use crate::error::{Error, FeedError};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct Scripted(Mutex<Vec<Result<Vec<CatalogEntry>>>>);

    #[async_trait]
    impl CatalogSource for Scripted {
        async fn fetch_entries(&self) -> Result<Vec<CatalogEntry>> {
            let mut script = self.0.lock();
            if script.is_empty() {
                return Err(FeedError::Unavailable { status: 503 }.into());
            }
            script.remove(0)
        }
    }

    #[test]
    fn empty_catalog_is_an_error() {
        let source = Scripted(Mutex::new(vec![Ok(vec![])]));
        let err = tokio_test::block_on(load_catalog(&source)).unwrap_err();
        assert!(matches!(err, Error::Domain(_)));
    }

    #[tokio::test]
    async fn refresh_swaps_snapshot_and_survives_failures() {
        let initial = Catalog::from_entries(vec![CatalogEntry::new(Category::Sport, "soccer", "Soccer")])
            .unwrap();
        let store = Arc::new(CatalogStore::new(initial));
        let source = Arc::new(Scripted(Mutex::new(vec![
            Err(FeedError::Unavailable { status: 502 }.into()),
            Ok(vec![CatalogEntry::new(Category::Sport, "soccer", "Soccer").inactive()]),
        ])));
        let (tx, mut rx) = watch::channel(0);
        let handle = CatalogRefresher::new(source, store.clone(), Duration::from_millis(5)).spawn(tx);

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(!store.current().is_active(Category::Sport, "soccer"));
        handle.abort();
    }
}
