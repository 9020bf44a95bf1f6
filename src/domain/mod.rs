//! Feed-agnostic domain types: catalog, quotes, market books, fair prices
//! and opportunities.
//!
//! Nothing in here performs I/O or knows about a particular odds provider.

pub mod book;
pub mod catalog;
pub mod error;
pub mod fair;
pub mod id;
pub mod money;
pub mod opportunity;
pub mod quote;
pub mod stake;

pub use book::{MarketBookEntry, Rejection, SelectionBook};
pub use catalog::{BookPolicy, Catalog, CatalogEntry, Category, SportsbookPolicy};
pub use fair::{DevigMethod, FairPriceEstimate, ReferenceSource};
pub use id::{EventPosition, LeagueId, MarketId, SelectionId, SportId, SportsbookId};
pub use money::Odds;
pub use opportunity::{Leg, Opportunity, OpportunityKey, OpportunityKind};
pub use quote::{Lock, Quote, QuoteKey, QuoteUpdate};
pub use stake::StakeAllocation;
