//! Market book, detection, filtering and sportsbook policy configuration.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::domain::catalog::{BookPolicy, SportsbookPolicy};
use crate::domain::fair::{DevigMethod, ReferenceSource};

/// Market book retention.
#[derive(Debug, Clone, Deserialize)]
pub struct BookConfig {
    /// Quotes older than this are evicted and never used.
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,
    /// Interval of the background sweep that evicts stale quotes from idle
    /// markets. Markets with standing opportunities are re-checked when their
    /// oldest quote expires instead.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

const fn default_staleness_secs() -> u64 {
    30
}

const fn default_sweep_interval_secs() -> u64 {
    10
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            staleness_secs: default_staleness_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Fair pricing and opportunity thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Minimum EV (fraction of stake) before an EV opportunity is emitted.
    #[serde(default = "default_ev_threshold")]
    pub ev_threshold: f64,
    /// Arbitrage requires `sum(1 / best) < 1 - arb_safety_margin`.
    #[serde(default = "default_arb_safety_margin")]
    pub arb_safety_margin: Decimal,
    /// Edge movement that counts as a material change of an emitted
    /// opportunity.
    #[serde(default = "default_edge_tolerance")]
    pub edge_tolerance: f64,
    /// Devig methods computed for every market.
    #[serde(default = "default_methods")]
    pub methods: Vec<DevigMethod>,
    /// Method whose estimate drives EV detection.
    #[serde(default = "default_benchmark")]
    pub benchmark: DevigMethod,
    /// Which quotes the fair price is derived from.
    #[serde(default = "default_reference")]
    pub reference: ReferenceSource,
    /// Reference markets whose implied total falls outside this range are
    /// treated as degenerate.
    #[serde(default = "default_min_reference_total")]
    pub min_reference_total: f64,
    #[serde(default = "default_max_reference_total")]
    pub max_reference_total: f64,
}

fn default_ev_threshold() -> f64 {
    0.03
}

fn default_arb_safety_margin() -> Decimal {
    dec!(0.005)
}

fn default_edge_tolerance() -> f64 {
    0.001
}

fn default_methods() -> Vec<DevigMethod> {
    vec![DevigMethod::Multiplicative, DevigMethod::Power]
}

fn default_benchmark() -> DevigMethod {
    DevigMethod::Multiplicative
}

fn default_reference() -> ReferenceSource {
    ReferenceSource::Consensus
}

fn default_min_reference_total() -> f64 {
    0.6
}

fn default_max_reference_total() -> f64 {
    2.0
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            ev_threshold: default_ev_threshold(),
            arb_safety_margin: default_arb_safety_margin(),
            edge_tolerance: default_edge_tolerance(),
            methods: default_methods(),
            benchmark: default_benchmark(),
            reference: default_reference(),
            min_reference_total: default_min_reference_total(),
            max_reference_total: default_max_reference_total(),
        }
    }
}

/// Which parts of the catalog are subscribed and kept.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Sports to stream. Empty means every active sport in the catalog.
    #[serde(default)]
    pub sports: Vec<String>,
    /// League allowlist. Empty means every active league.
    #[serde(default)]
    pub leagues: Vec<String>,
    /// Market allowlist by canonical name. Empty means every market.
    #[serde(default)]
    pub markets: Vec<String>,
    /// Keep only the provider's main line for spread and total markets.
    ///
    /// Alternate spread lines share a market id with the mirrored main line,
    /// so turning this off can put more than two selections in one market.
    #[serde(default = "default_main_lines_only")]
    pub main_lines_only: bool,
    /// Drop in-play quotes.
    #[serde(default)]
    pub exclude_live: bool,
}

const fn default_main_lines_only() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sports: Vec::new(),
            leagues: Vec::new(),
            markets: Vec::new(),
            main_lines_only: default_main_lines_only(),
            exclude_live: false,
        }
    }
}

/// Sportsbook inclusion policy as written in the config file.
///
/// ```toml
/// [sportsbooks]
/// default = "included"
///
/// [sportsbooks.books]
/// betfair_exchange_lay = "excluded"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SportsbooksConfig {
    #[serde(default)]
    pub default: BookPolicy,
    #[serde(default)]
    pub books: BTreeMap<String, BookPolicy>,
}

impl SportsbooksConfig {
    /// Build the domain policy.
    #[must_use]
    pub fn policy(&self) -> SportsbookPolicy {
        self.books
            .iter()
            .fold(SportsbookPolicy::new(self.default), |policy, (book, p)| {
                policy.with(book.as_str(), *p)
            })
    }
}

/// Pipeline worker settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of market shards, each owned by one worker task.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Tasks normalizing batches. Each session group is pinned to one.
    #[serde(default = "default_dispatchers")]
    pub dispatchers: usize,
    /// Capacity of each worker's queue.
    #[serde(default = "default_worker_queue")]
    pub worker_queue: usize,
    /// Interval between statistics log lines.
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

const fn default_workers() -> usize {
    4
}

const fn default_dispatchers() -> usize {
    2
}

const fn default_worker_queue() -> usize {
    4096
}

const fn default_stats_interval_secs() -> u64 {
    60
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            dispatchers: default_dispatchers(),
            worker_queue: default_worker_queue(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

/// Catalog refresh settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Seconds between background catalog refreshes. 0 disables refreshing.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

const fn default_refresh_interval_secs() -> u64 {
    3600
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::SportsbookId;

    #[test]
    fn sportsbooks_config_builds_policy() {
        let cfg: SportsbooksConfig = toml::from_str(
            r#"
default = "excluded"

[books]
pinnacle = "included"
betfair_exchange_lay = "excluded"
"#,
        )
        .unwrap();
        let policy = cfg.policy();
        assert!(policy.allows(&SportsbookId::from("pinnacle")));
        assert!(!policy.allows(&SportsbookId::from("draftkings")));
    }

    #[test]
    fn detection_defaults() {
        let cfg = DetectionConfig::default();
        assert_eq!(cfg.ev_threshold, 0.03);
        assert_eq!(cfg.arb_safety_margin, dec!(0.005));
        assert!(cfg.methods.contains(&cfg.benchmark));
    }

    #[test]
    fn reference_source_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            reference: ReferenceSource,
        }
        let w: Wrapper = toml::from_str(r#"reference = "best_price""#).unwrap();
        assert_eq!(w.reference, ReferenceSource::BestPrice);
        let w: Wrapper = toml::from_str(r#"reference = { sharp = "pinnacle" }"#).unwrap();
        assert_eq!(w.reference, ReferenceSource::Sharp(SportsbookId::from("pinnacle")));
    }
}
