use std::path::Path;

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Validate configuration file without starting the engine.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    let config = Config::load(path)?;

    output::section("Configuration Check");
    output::field("Config", path.display());
    output::success("Configuration file is valid");

    output::section("Summary");
    output::field("API", &config.feed.api_url);
    output::field("Stream", &config.feed.stream_url);
    output::field("Sports", list_or_all(&config.filters.sports));
    output::field("Leagues", list_or_all(&config.filters.leagues));
    output::field("Markets", list_or_all(&config.filters.markets));
    output::field("Main lines", config.filters.main_lines_only);
    output::field("Methods", format!("{:?}", config.detection.methods));
    output::field("Benchmark", format!("{:?}", config.detection.benchmark));
    output::field("Reference", &config.detection.reference);
    output::field("EV threshold", config.detection.ev_threshold);
    output::field("Arb margin", config.detection.arb_safety_margin);

    if config.api_key().is_ok() {
        output::success("API key detected");
    } else {
        output::warning("API key not configured (set OPTICODDS_API_KEY to stream)");
    }

    output::success("Configuration check complete");
    Ok(())
}

fn list_or_all(values: &[String]) -> String {
    if values.is_empty() {
        "all".to_string()
    } else {
        values.join(", ")
    }
}
