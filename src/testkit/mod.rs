//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`feed`]: Mock [`OddsFeed`](crate::port::outbound::feed::OddsFeed)
//!   implementations: `ScriptedFeed`, `ChannelFeed`.
//! - [`domain`]: Builders for raw events, quotes, catalogs and books.
//! - [`config`]: Canonical test configurations.

pub mod config;
pub mod domain;
pub mod feed;
