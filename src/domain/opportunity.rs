//! Detected betting opportunities.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::DomainError;
use super::id::{MarketId, SelectionId, SportsbookId};
use super::money::Odds;
use super::stake::StakeAllocation;

/// What kind of edge was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    /// A single price above its fair value.
    Ev,
    /// Best prices across books whose implied probabilities sum below 1.
    Arbitrage,
}

impl fmt::Display for OpportunityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ev => write!(f, "ev"),
            Self::Arbitrage => write!(f, "arbitrage"),
        }
    }
}

/// One bet of an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Leg {
    pub sportsbook: SportsbookId,
    pub selection: SelectionId,
    pub odds: Odds,
}

/// Identity used to recognise the same opportunity across book versions.
///
/// Prices are deliberately excluded so a price move updates an existing
/// opportunity instead of creating an unrelated one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpportunityKey {
    pub kind: OpportunityKind,
    pub market: MarketId,
    pub legs: Vec<(SportsbookId, SelectionId)>,
}

/// A detected opportunity computed against one market book version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub id: Uuid,
    pub kind: OpportunityKind,
    pub market: MarketId,
    pub legs: Vec<Leg>,
    /// EV fraction for [`OpportunityKind::Ev`], arbitrage margin
    /// `1 - sum(implied)` for [`OpportunityKind::Arbitrage`].
    pub edge: f64,
    /// Fair probability of the leg for EV opportunities.
    pub fair_probability: Option<f64>,
    pub generated_at: DateTime<Utc>,
    pub book_version: u64,
    pub allocation: Option<StakeAllocation>,
    /// Previously emitted opportunity this one replaces.
    pub supersedes: Option<Uuid>,
}

impl Opportunity {
    /// Build an EV opportunity on a single leg.
    #[must_use]
    pub fn ev(market: MarketId, leg: Leg, fair_probability: f64, edge: f64, book_version: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: OpportunityKind::Ev,
            market,
            legs: vec![leg],
            edge,
            fair_probability: Some(fair_probability),
            generated_at: Utc::now(),
            book_version,
            allocation: None,
            supersedes: None,
        }
    }

    /// Build an arbitrage opportunity.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyLegs`] when `legs` is empty.
    pub fn arbitrage(
        market: MarketId,
        legs: Vec<Leg>,
        edge: f64,
        allocation: StakeAllocation,
        book_version: u64,
    ) -> Result<Self, DomainError> {
        if legs.is_empty() {
            return Err(DomainError::EmptyLegs);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            kind: OpportunityKind::Arbitrage,
            market,
            legs,
            edge,
            fair_probability: None,
            generated_at: Utc::now(),
            book_version,
            allocation: Some(allocation),
            supersedes: None,
        })
    }

    /// Mark this opportunity as replacing an earlier emission.
    #[must_use]
    pub fn superseding(mut self, previous: Uuid) -> Self {
        self.supersedes = Some(previous);
        self
    }

    #[must_use]
    pub fn key(&self) -> OpportunityKey {
        let mut legs: Vec<_> = self
            .legs
            .iter()
            .map(|l| (l.sportsbook.clone(), l.selection.clone()))
            .collect();
        legs.sort();
        OpportunityKey {
            kind: self.kind,
            market: self.market.clone(),
            legs,
        }
    }

    /// True when every leg has the same price in both opportunities.
    #[must_use]
    pub fn same_prices(&self, other: &Self) -> bool {
        self.legs.len() == other.legs.len()
            && self.legs.iter().all(|leg| {
                other.legs.iter().any(|o| {
                    o.sportsbook == leg.sportsbook
                        && o.selection == leg.selection
                        && o.odds == leg.odds
                })
            })
    }
}
