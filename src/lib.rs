//! Sharpline - streaming sportsbook odds aggregation.
//!
//! Consumes a push feed of odds updates from many sportsbooks, keeps a
//! per-market book of the latest quote from each book, derives fair
//! probabilities by removing the bookmaker margin, and reports positive
//! expected value and arbitrage opportunities as the book changes.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Provider-agnostic types: catalog, quotes, books, fair
//!   prices, opportunities and stake allocation
//! - [`port`] - Traits for the odds feed, catalog source and notifiers
//! - [`application`] - Normalization, the market book, pricing, detection
//!   and the sharded pipeline
//! - [`adapter`] - OpticOdds client and the CLI
//! - [`infrastructure`] - Configuration, feed sessions and orchestration
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use sharpline::infrastructure::config::settings::Config;
//! use sharpline::infrastructure::orchestration::orchestrator::Orchestrator;
//!
//! # async fn run() -> sharpline::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! config.init_logging();
//! Orchestrator::run(config).await
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
