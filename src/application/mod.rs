//! Application services (use cases).
//!
//! These services turn raw feed events into market books, fair prices and
//! opportunities. They depend on domain types and ports only.

pub mod book;
pub mod catalog;
pub mod detector;
pub mod normalize;
pub mod pipeline;
pub mod pricing;
pub mod resume;
pub mod stats;
