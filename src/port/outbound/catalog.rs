//! Catalog source port.

use async_trait::async_trait;

use crate::domain::catalog::CatalogEntry;
use crate::error::Error;

/// Bulk reader of catalog metadata.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch every sport, league, market and sportsbook entry.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider cannot be reached or answers with
    /// an unusable payload.
    async fn fetch_entries(&self) -> Result<Vec<CatalogEntry>, Error>;
}
