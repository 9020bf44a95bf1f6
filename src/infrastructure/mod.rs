//! Infrastructure layer.
//!
//! Provides technical concerns that support the application without containing
//! business logic. This layer handles configuration, feed sessions and
//! runtime resource coordination.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`catalog`] - Catalog loading and refresh
//! - [`config`] - Configuration loading and validation
//! - [`orchestration`] - Runtime orchestration
//! - [`session`] - Grouped feed sessions with reconnection and health

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod orchestration;
pub mod session;
