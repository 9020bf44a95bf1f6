//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use std::time::Duration;

use crate::application::pipeline::PipelineSettings;
use crate::domain::fair::{DevigMethod, ReferenceSource};
use crate::infrastructure::config::stream::ReconnectionConfig;

/// Fast reconnection config with zero delays so tests never wait.
pub fn reconnection() -> ReconnectionConfig {
    ReconnectionConfig {
        initial_delay_ms: 0,
        max_delay_ms: 0,
        backoff_multiplier: 1.0,
        max_consecutive_failures: 3,
        circuit_breaker_cooldown_ms: 0,
    }
}

/// Pipeline settings with `workers` shards, best-price multiplicative
/// pricing and a sweep interval long enough to stay out of the way.
pub fn pipeline(workers: usize) -> PipelineSettings {
    PipelineSettings {
        workers,
        dispatchers: 2,
        worker_queue: 64,
        sweep_interval: Duration::from_secs(3600),
        methods: vec![DevigMethod::Multiplicative, DevigMethod::Power],
        benchmark: DevigMethod::Multiplicative,
        reference: ReferenceSource::BestPrice,
    }
}
