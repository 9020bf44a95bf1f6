//! Catalog lookups against the OpticOdds REST API.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::dto::{id_text, CatalogItem, ListResponse};
use super::settings::OpticOddsConfig;
use crate::domain::catalog::{CatalogEntry, Category};
use crate::domain::id::canonical_key;
use crate::error::{Error, FeedError};
use crate::port::outbound::catalog::CatalogSource;

/// Reads sports, leagues, markets and sportsbooks over HTTP.
pub struct OpticOddsCatalog {
    client: reqwest::Client,
    config: OpticOddsConfig,
}

impl OpticOddsCatalog {
    /// Create a catalog client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: OpticOddsConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    async fn list(&self, path: &str, params: &[(&str, &str)]) -> Result<Vec<CatalogItem>, Error> {
        let url = format!("{}/{path}", self.config.api_url.trim_end_matches('/'));
        let mut request = self.client.get(&url).query(params);
        if let Some(key) = self.config.api_key.as_deref() {
            request = request.query(&[("key", key)]);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::from_status(status.as_u16(), format!("GET {path}")).into());
        }
        let body: ListResponse = response.json().await?;
        debug!(path, items = body.data.len(), "Catalog page fetched");
        Ok(body.data)
    }
}

/// Convert a catalog item; items without an id are skipped.
///
/// Sportsbooks are keyed by the canonical form of their name because the
/// odds stream identifies books by display name.
fn to_entry(category: Category, item: CatalogItem, sport: Option<&str>) -> Option<CatalogEntry> {
    let raw_id = id_text(item.id.as_ref());
    let name = item.name.clone().or_else(|| raw_id.clone())?;
    let id = match category {
        Category::Sportsbook | Category::Market => canonical_key(&name),
        Category::Sport | Category::League => raw_id?,
    };
    if id.is_empty() {
        return None;
    }
    Some(CatalogEntry {
        id,
        name,
        category,
        active: item.is_active.unwrap_or(true),
        sport: sport
            .map(str::to_string)
            .or_else(|| id_text(item.sport.as_ref())),
    })
}

#[async_trait]
impl CatalogSource for OpticOddsCatalog {
    async fn fetch_entries(&self) -> Result<Vec<CatalogEntry>, Error> {
        let mut entries: Vec<CatalogEntry> = self
            .list("sports", &[])
            .await?
            .into_iter()
            .filter_map(|item| to_entry(Category::Sport, item, None))
            .collect();

        let sports: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
        for sport in &sports {
            match self.list("leagues", &[("sport", sport)]).await {
                Ok(items) => entries.extend(
                    items
                        .into_iter()
                        .filter_map(|item| to_entry(Category::League, item, Some(sport))),
                ),
                Err(e) if e.is_fatal_feed_error() => return Err(e),
                Err(e) => warn!(sport = %sport, error = %e, "League lookup failed, skipping sport"),
            }
        }

        entries.extend(
            self.list("sportsbooks", &[])
                .await?
                .into_iter()
                .filter_map(|item| to_entry(Category::Sportsbook, item, None)),
        );

        // Market lookups are optional; without them every market is accepted.
        match self.list("markets", &[]).await {
            Ok(items) => entries.extend(
                items
                    .into_iter()
                    .filter_map(|item| to_entry(Category::Market, item, None)),
            ),
            Err(e) => warn!(error = %e, "Market lookup failed, markets will not be checked"),
        }

        Ok(entries)
    }
}
