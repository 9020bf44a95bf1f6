//! OpticOdds adapter.
//!
//! Catalog lookups over REST and odds streaming over server-sent events.

pub mod catalog;
pub mod dto;
pub mod settings;
pub mod sse;
pub mod stream;

pub use catalog::OpticOddsCatalog;
pub use settings::OpticOddsConfig;
pub use stream::OpticOddsFeed;
