//! Application orchestration.
//!
//! Runtime wiring and lifecycle management: catalog, sessions, pipeline and
//! shutdown.

pub mod orchestrator;
mod runtime;
