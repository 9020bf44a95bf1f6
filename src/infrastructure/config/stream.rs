//! Feed session and reconnection configuration.

use serde::Deserialize;

/// Upper bound on leagues sharing one feed connection.
pub const MAX_LEAGUES_PER_GROUP: usize = 10;

/// Feed reconnection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectionConfig {
    /// Initial delay before first reconnection attempt (milliseconds).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied to delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Consecutive failures before the group is reported unhealthy and the
    /// circuit breaker trips.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Cooldown period after circuit breaker trips (milliseconds).
    #[serde(default = "default_circuit_breaker_cooldown_ms")]
    pub circuit_breaker_cooldown_ms: u64,
}

fn default_initial_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_consecutive_failures() -> u32 {
    10
}

fn default_circuit_breaker_cooldown_ms() -> u64 {
    120000 // 2 minutes
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_consecutive_failures: default_max_consecutive_failures(),
            circuit_breaker_cooldown_ms: default_circuit_breaker_cooldown_ms(),
        }
    }
}

/// How leagues are split into feed sessions.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Leagues per connection, at most [`MAX_LEAGUES_PER_GROUP`].
    #[serde(default = "default_max_leagues_per_group")]
    pub max_leagues_per_group: usize,
    /// Capacity of the channel between sessions and the pipeline.
    ///
    /// Sessions wait when it is full, which throttles reading from the feed.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Seconds without any event (pings included) before a connection is
    /// considered dead.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

const fn default_max_leagues_per_group() -> usize {
    MAX_LEAGUES_PER_GROUP
}

const fn default_channel_capacity() -> usize {
    1024
}

const fn default_idle_timeout_secs() -> u64 {
    90
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_leagues_per_group: default_max_leagues_per_group(),
            channel_capacity: default_channel_capacity(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}
