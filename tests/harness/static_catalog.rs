use async_trait::async_trait;

use sharpline::domain::catalog::{CatalogEntry, Category};
use sharpline::error::Error;
use sharpline::port::outbound::catalog::CatalogSource;

/// Catalog source returning a fixed entry list.
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Soccer with `epl` and `laliga`, two books.
    pub fn soccer() -> Self {
        Self::new(vec![
            CatalogEntry::new(Category::Sport, "soccer", "Soccer"),
            CatalogEntry::league("soccer", "epl", "Premier League"),
            CatalogEntry::league("soccer", "laliga", "La Liga"),
            CatalogEntry::new(Category::Sportsbook, "pinnacle", "Pinnacle"),
            CatalogEntry::new(Category::Sportsbook, "draftkings", "DraftKings"),
        ])
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn fetch_entries(&self) -> Result<Vec<CatalogEntry>, Error> {
        Ok(self.entries.clone())
    }
}
