//! Outbound adapters (driven side).

pub mod opticodds;
