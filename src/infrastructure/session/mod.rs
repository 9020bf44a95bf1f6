//! Feed sessions.
//!
//! Active leagues are split into groups, each served by one reconnecting
//! stream connection that resumes from its last acknowledged position.

pub mod grouping;
pub mod health;
pub mod manager;
pub mod reconnecting;
