//! Shared handle to the current catalog snapshot.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::domain::catalog::Catalog;

/// Holds the active [`Catalog`] and swaps it wholesale on refresh.
///
/// Readers clone the inner `Arc` and keep using their snapshot even if a
/// refresh lands mid-batch.
#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read())
    }

    /// Replace the snapshot.
    pub fn replace(&self, catalog: Catalog) {
        let entries = catalog.len();
        *self.current.write() = Arc::new(catalog);
        info!(entries, "Catalog replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CatalogEntry, Category};

    #[test]
    fn readers_keep_their_snapshot_across_replace() {
        let store = CatalogStore::new(
            Catalog::from_entries(vec![CatalogEntry::new(Category::Sport, "soccer", "Soccer")])
                .unwrap(),
        );
        let before = store.current();
        store.replace(
            Catalog::from_entries(vec![
                CatalogEntry::new(Category::Sport, "soccer", "Soccer").inactive()
            ])
            .unwrap(),
        );
        assert!(before.is_active(Category::Sport, "soccer"));
        assert!(!store.current().is_active(Category::Sport, "soccer"));
    }
}
