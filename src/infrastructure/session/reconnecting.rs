//! Reconnecting wrapper for [`OddsFeed`].
//!
//! Turns a single-connection feed into an endless sequence of batches for one
//! session group. Disconnects, stream ends and idle timeouts trigger a
//! reconnect with exponential backoff that resumes from the last
//! acknowledged position. Fatal feed errors end the sequence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::health::GroupHealth;
use crate::application::resume::ResumeCursor;
use crate::error::Error;
use crate::infrastructure::config::stream::ReconnectionConfig;
use crate::port::outbound::feed::{FeedEvent, OddsBatch, OddsFeed, Subscription};

/// Circuit breaker state for connection attempts.
///
/// Implements the circuit breaker pattern to prevent thundering herd problems
/// when the provider is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    /// Normal operation; connections are allowed.
    Closed,
    /// Too many consecutive failures; connections blocked until cooldown expires.
    Open { until: Instant },
}

/// Endless batch source for one session group.
pub struct ReconnectingFeed<F: OddsFeed> {
    inner: F,
    config: ReconnectionConfig,
    subscription: Subscription,
    cursor: Arc<ResumeCursor>,
    health: GroupHealth,
    idle_timeout: Duration,
    /// Current consecutive failure count.
    consecutive_failures: u32,
    /// Current backoff delay in milliseconds.
    current_delay_ms: u64,
    circuit_state: CircuitState,
    connected: bool,
    /// Set once the first connection attempt has been made.
    attempted: bool,
}

impl<F: OddsFeed> ReconnectingFeed<F> {
    /// Wrap `inner`. The first call to [`next_batch`](Self::next_batch)
    /// connects without delay.
    pub fn new(
        inner: F,
        subscription: Subscription,
        cursor: Arc<ResumeCursor>,
        health: GroupHealth,
        config: ReconnectionConfig,
        idle_timeout: Duration,
    ) -> Self {
        let initial_delay = config.initial_delay_ms;
        Self {
            inner,
            config,
            subscription,
            cursor,
            health,
            idle_timeout,
            consecutive_failures: 0,
            current_delay_ms: initial_delay,
            circuit_state: CircuitState::Closed,
            connected: false,
            attempted: false,
        }
    }

    /// Reset backoff state once data flows again.
    fn reset_backoff(&mut self) {
        self.consecutive_failures = 0;
        self.current_delay_ms = self.config.initial_delay_ms;
        self.circuit_state = CircuitState::Closed;
    }

    /// Current delay plus up to 20% jitter; advances the delay for the next
    /// call.
    fn next_delay(&mut self) -> Duration {
        let base_delay = Duration::from_millis(self.current_delay_ms);
        let delay = base_delay + Duration::from_millis(Self::jitter_ms(base_delay));

        let next_delay = (self.current_delay_ms as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay_ms = next_delay.min(self.config.max_delay_ms);

        delay
    }

    fn jitter_ms(base_delay: Duration) -> u64 {
        let jitter_range_ms = (base_delay.as_millis() as u64) / 5;
        if jitter_range_ms == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..=jitter_range_ms)
    }

    /// Record a failed connection or a dropped stream.
    ///
    /// Trips the circuit breaker and reports the group unhealthy once the
    /// consecutive failure budget is spent.
    fn record_failure(&mut self, reason: &str) {
        self.consecutive_failures += 1;
        self.connected = false;

        if self.consecutive_failures >= self.config.max_consecutive_failures {
            let cooldown = Duration::from_millis(self.config.circuit_breaker_cooldown_ms);
            self.circuit_state = CircuitState::Open {
                until: Instant::now() + cooldown,
            };
            error!(
                group = self.health.group(),
                sport = %self.subscription.sport,
                failures = self.consecutive_failures,
                cooldown_secs = cooldown.as_secs(),
                "Circuit breaker tripped, pausing reconnection attempts"
            );
            self.health.unhealthy(reason);
        }
    }

    /// Wait out the circuit breaker and backoff, then connect once.
    ///
    /// # Errors
    ///
    /// Returns the connect error. Fatal errors also mark the group failed.
    async fn reconnect(&mut self) -> Result<(), Error> {
        if let CircuitState::Open { until } = self.circuit_state {
            let remaining = until.saturating_duration_since(Instant::now());
            warn!(
                group = self.health.group(),
                remaining_secs = remaining.as_secs(),
                "Circuit breaker open, waiting for cooldown"
            );
            sleep(remaining).await;
            self.circuit_state = CircuitState::Closed;
            self.consecutive_failures = 0;
            self.current_delay_ms = self.config.initial_delay_ms;
        }

        if self.attempted {
            let delay = self.next_delay();
            self.health.backoff();
            info!(
                group = self.health.group(),
                delay_ms = delay.as_millis() as u64,
                attempt = self.consecutive_failures + 1,
                "Reconnecting after delay"
            );
            sleep(delay).await;
        }
        self.attempted = true;

        self.health.connecting();
        if self.cursor.recover() {
            warn!(
                group = self.health.group(),
                "Unprocessed batch was lost, replaying from last acknowledged position"
            );
        }
        let resume_from = self.cursor.acknowledged();
        match self
            .inner
            .connect(&self.subscription, resume_from.as_ref())
            .await
        {
            Ok(()) => {
                info!(
                    group = self.health.group(),
                    sport = %self.subscription.sport,
                    leagues = self.subscription.leagues.len(),
                    resume_from = ?resume_from.as_ref().map(|p| p.as_str()),
                    provider = self.inner.provider_name(),
                    "Feed connected"
                );
                self.connected = true;
                self.health.live();
                Ok(())
            }
            Err(e) if e.is_fatal_feed_error() => {
                error!(group = self.health.group(), error = %e, "Feed connection refused");
                self.health.failed(&e.to_string());
                Err(e)
            }
            Err(e) => {
                warn!(group = self.health.group(), error = %e, "Feed connection failed");
                self.record_failure(&e.to_string());
                Err(e)
            }
        }
    }

    /// Next batch from the feed, reconnecting as often as needed.
    ///
    /// # Errors
    ///
    /// Returns only fatal feed errors; the group must stop.
    pub async fn next_batch(&mut self) -> Result<OddsBatch, Error> {
        loop {
            if !self.connected {
                match self.reconnect().await {
                    Ok(()) => {}
                    Err(e) if e.is_fatal_feed_error() => return Err(e),
                    Err(_) => continue,
                }
            }

            match timeout(self.idle_timeout, self.inner.next_event()).await {
                Err(_) => {
                    warn!(
                        group = self.health.group(),
                        idle_secs = self.idle_timeout.as_secs(),
                        "Feed silent past idle timeout, will reconnect"
                    );
                    self.record_failure("idle timeout");
                }
                Ok(Some(FeedEvent::Batch(batch))) => {
                    if self.consecutive_failures > 0 {
                        debug!(
                            group = self.health.group(),
                            "Received batch after reconnection, resetting failure count"
                        );
                        self.reset_backoff();
                    }
                    self.health.live();
                    return Ok(batch);
                }
                Ok(Some(FeedEvent::Heartbeat)) => {}
                Ok(Some(FeedEvent::Disconnected { reason })) => {
                    warn!(group = self.health.group(), reason = %reason, "Connection lost, will reconnect");
                    self.record_failure(&reason);
                }
                Ok(None) => {
                    warn!(group = self.health.group(), "Feed ended unexpectedly, will reconnect");
                    self.record_failure("stream ended");
                }
            }
        }
    }

    /// Provider name of the wrapped feed.
    pub fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}
