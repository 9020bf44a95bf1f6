//! Handler for the `run` command.

use tokio::sync::watch;
use tracing::info;

use crate::adapter::inbound::cli::command::RunArgs;
use crate::adapter::inbound::cli::output;
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::orchestration::orchestrator::Orchestrator;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    apply_overrides(&mut config, args)?;
    config.init_logging();

    if !output::is_quiet() || output::is_json() {
        print_startup_config(args, &config);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    Orchestrator::run_with_shutdown(config, shutdown_rx).await
}

fn apply_overrides(config: &mut Config, args: &RunArgs) -> Result<()> {
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    if args.json_logs || output::is_json() {
        config.logging.format = "json".into();
    }
    if let Some(threshold) = args.ev_threshold {
        if !(threshold >= 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "ev_threshold",
                reason: "must be 0 or greater".into(),
            }
            .into());
        }
        config.detection.ev_threshold = threshold;
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers",
                reason: "must be greater than 0".into(),
            }
            .into());
        }
        config.pipeline.workers = workers;
    }
    if args.exclude_live {
        config.filters.exclude_live = true;
    }
    Ok(())
}

fn print_startup_config(args: &RunArgs, config: &Config) {
    let sports = if config.filters.sports.is_empty() {
        "all".to_string()
    } else {
        config.filters.sports.join(", ")
    };

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Config", args.config.display());
    output::field("Sports", sports);
    output::field("Reference", &config.detection.reference);
    output::field("EV threshold", config.detection.ev_threshold);
    output::field("Workers", config.pipeline.workers);
    if output::verbosity() > 0 {
        output::field("Staleness", format!("{}s", config.book.staleness_secs));
        output::field("Arb margin", config.detection.arb_safety_margin);
    }
    if config.filters.exclude_live {
        output::warning("In-play markets are ignored");
    }
}
