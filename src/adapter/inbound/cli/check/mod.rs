//! Configuration and catalog diagnostic command handlers.

pub mod catalog;
pub mod config;
