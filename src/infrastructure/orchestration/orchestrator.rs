//! Infrastructure orchestration façade.

use tokio::sync::watch;

use crate::error::Result;
use crate::infrastructure::config::settings::Config;

pub use super::runtime::{run_with_components, run_with_shutdown, Components};

/// Main application orchestrator.
pub struct Orchestrator;

impl Orchestrator {
    /// Run until the process is interrupted.
    ///
    /// # Errors
    ///
    /// Returns startup failures: missing API key, unreachable or empty
    /// catalog.
    pub async fn run(config: Config) -> Result<()> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        run_with_shutdown(config, shutdown_rx).await
    }

    /// Run with externally controlled shutdown signal.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::run`].
    pub async fn run_with_shutdown(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
        run_with_shutdown(config, shutdown).await
    }
}
