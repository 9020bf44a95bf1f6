//! `check catalog`: fetch the provider catalog and show the session plan.

use std::path::Path;

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::bootstrap::build_catalog_source;
use crate::infrastructure::catalog::load_catalog;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::session::grouping::plan_groups;

/// Load the catalog once and print what `run` would subscribe to.
pub async fn execute_catalog<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = Config::load(config_path.as_ref())?;
    let source = build_catalog_source(&config)?;
    let catalog = load_catalog(source.as_ref()).await?;

    output::section("Catalog");
    output::field("Entries", catalog.len());
    output::field("Sportsbooks", catalog.active_sportsbooks().len());
    for (sport, leagues) in catalog.active_leagues_by_sport() {
        output::field(sport.as_str(), format!("{} leagues", leagues.len()));
    }

    let policy = config.sportsbooks.policy();
    let groups = plan_groups(
        &catalog,
        &config.filters,
        &policy,
        config.sessions.max_leagues_per_group,
    );

    output::section("Session Plan");
    output::field("Groups", output::highlight(groups.len()));
    if output::verbosity() > 0 {
        for group in &groups {
            let leagues: Vec<&str> = group
                .subscription
                .leagues
                .iter()
                .map(|l| l.as_str())
                .collect();
            output::field(
                &format!("#{}", group.index),
                format!("{}: {}", group.subscription.sport, leagues.join(", ")),
            );
        }
    }
    if groups.is_empty() {
        output::warning("No active leagues match the configured filters");
    } else {
        output::success("Catalog check complete");
    }
    Ok(())
}
