//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the odds feed, the catalog source and the
//! notification sink.

pub mod catalog;
pub mod feed;
pub mod notifier;
