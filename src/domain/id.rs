//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sport identifier (e.g. `basketball`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SportId(String);

impl SportId {
    /// Create a new `SportId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the sport ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SportId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// League identifier (e.g. `nba`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeagueId(String);

impl LeagueId {
    /// Create a new `LeagueId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the league ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeagueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LeagueId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Sportsbook identifier.
///
/// Regional or product variants of one operator carry distinct ids
/// (`betfair_exchange` vs `betfair_exchange_lay`) and are treated as
/// separate books everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SportsbookId(String);

impl SportsbookId {
    /// Create a new `SportsbookId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the sportsbook ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SportsbookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SportsbookId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SportsbookId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Market identifier.
///
/// Identifies one bettable proposition on one fixture; every selection of
/// the market must be mutually exclusive with the others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketId(String);

impl MarketId {
    /// Create a new `MarketId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the market ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MarketId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for MarketId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Selection (outcome) identifier within a market.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectionId(String);

impl SelectionId {
    /// Create a new `SelectionId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the selection ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SelectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SelectionId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SelectionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opaque stream position handed out by a feed.
///
/// Sent back on reconnect so the feed can replay everything after it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventPosition(String);

impl EventPosition {
    /// Create a new `EventPosition` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the position as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventPosition {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Canonical form of a provider name: lower-case alphanumeric tokens joined
/// by `_`. Signs and decimal points inside tokens are kept so lines such as
/// `-1.5` survive.
///
/// ```
/// assert_eq!(sharpline::domain::id::canonical_key("  Betfair Exchange (Lay) "), "betfair_exchange_lay");
/// assert_eq!(sharpline::domain::id::canonical_key("Over 215.5"), "over_215.5");
/// ```
#[must_use]
pub fn canonical_key(raw: &str) -> String {
    raw.split(|c: char| !(c.is_alphanumeric() || matches!(c, '.' | '+' | '-')))
        .map(|token| token.trim_matches('.'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn canonical_key_collapses_separators() {
        assert_eq!(canonical_key("Point  Spread"), "point_spread");
        assert_eq!(canonical_key("DraftKings"), "draftkings");
        assert_eq!(canonical_key("Boston Celtics -1.5"), "boston_celtics_-1.5");
        assert_eq!(canonical_key("   "), "");
    }

    #[test]
    fn market_id_display_matches_inner() {
        let id = MarketId::new("f1:moneyline");
        assert_eq!(id.to_string(), "f1:moneyline");
        assert_eq!(id.as_str(), "f1:moneyline");
    }

    #[test]
    fn sportsbook_variants_are_distinct() {
        let mut books = HashSet::new();
        books.insert(SportsbookId::from("betfair_exchange"));
        books.insert(SportsbookId::from("betfair_exchange_lay"));
        assert_eq!(books.len(), 2);
    }

    #[test]
    fn selection_ids_compare_by_value() {
        assert_eq!(SelectionId::from("home"), SelectionId::new(String::from("home")));
        assert_ne!(SelectionId::from("home"), SelectionId::from("away"));
    }
}
