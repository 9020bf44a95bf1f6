//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! # Available Ports
//!
//! - [`outbound::feed::OddsFeed`] - Push connection delivering odds batches
//! - [`outbound::catalog::CatalogSource`] - Bulk catalog reads
//! - [`outbound::notifier::Notifier`] - Opportunity and health events

pub mod outbound;
