//! Canonical catalog of sports, leagues, markets and sportsbooks.
//!
//! A [`Catalog`] is an immutable snapshot. Refreshes build a new snapshot and
//! swap it in wholesale, so readers never observe a half-updated catalog.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{LeagueId, SportId, SportsbookId};

/// Kind of entity a catalog entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sport,
    League,
    Market,
    Sportsbook,
}

/// One entry in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub active: bool,
    /// Owning sport for league entries.
    #[serde(default)]
    pub sport: Option<String>,
}

impl CatalogEntry {
    /// Create an active entry with no parent.
    pub fn new(category: Category, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            active: true,
            sport: None,
        }
    }

    /// Create an active league entry owned by `sport`.
    pub fn league(sport: impl Into<String>, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sport: Some(sport.into()),
            ..Self::new(Category::League, id, name)
        }
    }

    /// Mark the entry inactive.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Immutable catalog snapshot.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: HashMap<(Category, String), CatalogEntry>,
    loaded_at: DateTime<Utc>,
}

impl Catalog {
    /// Build a snapshot from a bulk read.
    ///
    /// Later duplicates of the same `(category, id)` replace earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyCatalog`] when `entries` is empty.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, DomainError> {
        if entries.is_empty() {
            return Err(DomainError::EmptyCatalog);
        }
        let entries = entries
            .into_iter()
            .map(|e| ((e.category, e.id.clone()), e))
            .collect();
        Ok(Self {
            entries,
            loaded_at: Utc::now(),
        })
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, category: Category, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(&(category, id.to_string()))
    }

    /// True when the entry exists and is active.
    #[must_use]
    pub fn is_active(&self, category: Category, id: &str) -> bool {
        self.get(category, id).is_some_and(|e| e.active)
    }

    /// True when the catalog lists at least one entry of `category`.
    #[must_use]
    pub fn has_category(&self, category: Category) -> bool {
        self.entries.keys().any(|(c, _)| *c == category)
    }

    /// Active leagues grouped by their owning sport, in stable order.
    #[must_use]
    pub fn active_leagues_by_sport(&self) -> BTreeMap<SportId, Vec<LeagueId>> {
        let mut grouped: BTreeMap<SportId, Vec<LeagueId>> = BTreeMap::new();
        for entry in self.entries.values() {
            if entry.category != Category::League || !entry.active {
                continue;
            }
            let Some(sport) = entry.sport.as_deref() else {
                continue;
            };
            if !self.is_active(Category::Sport, sport) {
                continue;
            }
            grouped
                .entry(SportId::new(sport))
                .or_default()
                .push(LeagueId::new(entry.id.as_str()));
        }
        for leagues in grouped.values_mut() {
            leagues.sort();
        }
        grouped
    }

    /// All active sportsbooks, sorted.
    #[must_use]
    pub fn active_sportsbooks(&self) -> Vec<SportsbookId> {
        let mut books: Vec<_> = self
            .entries
            .values()
            .filter(|e| e.category == Category::Sportsbook && e.active)
            .map(|e| SportsbookId::new(e.id.as_str()))
            .collect();
        books.sort();
        books
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true for a constructed catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When this snapshot was built.
    #[must_use]
    pub const fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Inclusion policy for a sportsbook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookPolicy {
    #[default]
    Included,
    Excluded,
}

/// Per-sportsbook inclusion policy with a default for unlisted books.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SportsbookPolicy {
    default: BookPolicy,
    overrides: HashMap<SportsbookId, BookPolicy>,
}

impl SportsbookPolicy {
    /// Create a policy where unlisted books get `default`.
    #[must_use]
    pub fn new(default: BookPolicy) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// Set the policy for one book.
    #[must_use]
    pub fn with(mut self, book: impl Into<SportsbookId>, policy: BookPolicy) -> Self {
        self.overrides.insert(book.into(), policy);
        self
    }

    /// Whether quotes from `book` should be kept.
    #[must_use]
    pub fn allows(&self, book: &SportsbookId) -> bool {
        self.overrides.get(book).copied().unwrap_or(self.default) == BookPolicy::Included
    }

    /// Policy applied to books without an override.
    #[must_use]
    pub const fn default_policy(&self) -> BookPolicy {
        self.default
    }

    /// Books explicitly marked as included, sorted.
    #[must_use]
    pub fn explicitly_included(&self) -> Vec<SportsbookId> {
        let mut books: Vec<_> = self
            .overrides
            .iter()
            .filter(|(_, p)| **p == BookPolicy::Included)
            .map(|(b, _)| b.clone())
            .collect();
        books.sort();
        books
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_entries(vec![
            CatalogEntry::new(Category::Sport, "basketball", "Basketball"),
            CatalogEntry::new(Category::Sport, "curling", "Curling").inactive(),
            CatalogEntry::league("basketball", "nba", "NBA"),
            CatalogEntry::league("basketball", "wnba", "WNBA"),
            CatalogEntry::league("basketball", "euroleague", "EuroLeague").inactive(),
            CatalogEntry::league("curling", "wcf", "WCF"),
            CatalogEntry::new(Category::Sportsbook, "pinnacle", "Pinnacle"),
        ])
        .unwrap()
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(
            Catalog::from_entries(vec![]),
            Err(DomainError::EmptyCatalog)
        ));
    }

    #[test]
    fn inactive_entries_are_not_active() {
        let c = catalog();
        assert!(c.is_active(Category::League, "nba"));
        assert!(!c.is_active(Category::League, "euroleague"));
        assert!(!c.is_active(Category::League, "unknown"));
    }

    #[test]
    fn leagues_grouped_under_active_sports_only() {
        let grouped = catalog().active_leagues_by_sport();
        assert_eq!(grouped.len(), 1);
        let leagues = &grouped[&SportId::from("basketball")];
        assert_eq!(leagues, &vec![LeagueId::from("nba"), LeagueId::from("wnba")]);
    }

    #[test]
    fn policy_overrides_default() {
        let policy = SportsbookPolicy::new(BookPolicy::Included)
            .with("betfair_exchange_lay", BookPolicy::Excluded);
        assert!(policy.allows(&SportsbookId::from("betfair_exchange")));
        assert!(!policy.allows(&SportsbookId::from("betfair_exchange_lay")));

        let allowlist =
            SportsbookPolicy::new(BookPolicy::Excluded).with("pinnacle", BookPolicy::Included);
        assert!(allowlist.allows(&SportsbookId::from("pinnacle")));
        assert!(!allowlist.allows(&SportsbookId::from("draftkings")));
        assert_eq!(allowlist.explicitly_included(), vec![SportsbookId::from("pinnacle")]);
    }
}
