mod support;

use sharpline::domain::catalog::BookPolicy;
use sharpline::domain::fair::{DevigMethod, ReferenceSource};
use sharpline::domain::id::SportsbookId;
use sharpline::error::{ConfigError, Error};
use sharpline::infrastructure::config::settings::Config;

use support::config::{write_temp_config, MINIMAL};

#[test]
fn minimal_file_loads() {
    let file = write_temp_config(MINIMAL);
    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.logging.format, "compact");
    assert_eq!(config.filters.sports, vec!["soccer".to_string()]);
    assert_eq!(config.filters.leagues, vec!["epl".to_string()]);
    assert!(config.filters.main_lines_only);
    assert!(!config.filters.exclude_live);
    assert_eq!(config.detection.reference, ReferenceSource::Consensus);
}

#[test]
fn empty_file_yields_defaults() {
    let file = write_temp_config("");
    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.sessions.max_leagues_per_group, 10);
    assert_eq!(config.book.staleness_secs, 30);
    assert_eq!(
        config.detection.methods,
        vec![DevigMethod::Multiplicative, DevigMethod::Power]
    );
    assert_eq!(config.sportsbooks.default, BookPolicy::Included);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_temp_config("[detection\nev_threshold = ");
    let result = Config::load(file.path());
    assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
}

#[test]
fn oversized_groups_are_rejected() {
    let file = write_temp_config("[sessions]\nmax_leagues_per_group = 11\n");
    let result = Config::load(file.path());
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "max_leagues_per_group",
            ..
        }))
    ));
}

#[test]
fn unknown_log_format_is_rejected() {
    let file = write_temp_config("[logging]\nformat = \"xml\"\n");
    let result = Config::load(file.path());
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue { field: "format", .. }))
    ));
}

#[test]
fn benchmark_outside_methods_is_rejected() {
    let file = write_temp_config("[detection]\nmethods = [\"power\"]\nbenchmark = \"multiplicative\"\n");
    let result = Config::load(file.path());
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "benchmark",
            ..
        }))
    ));
}

#[test]
fn zero_dispatchers_are_rejected() {
    let file = write_temp_config("[pipeline]\ndispatchers = 0\n");
    let result = Config::load(file.path());
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "dispatchers",
            ..
        }))
    ));
}

#[test]
fn reversed_backoff_bounds_are_rejected() {
    let file = write_temp_config("[reconnection]\ninitial_delay_ms = 5000\nmax_delay_ms = 100\n");
    let result = Config::load(file.path());
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "max_delay_ms",
            ..
        }))
    ));
}

#[test]
fn reference_sources_parse() {
    let file = write_temp_config("[detection]\nreference = \"consensus\"\n");
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.detection.reference, ReferenceSource::Consensus);

    let file = write_temp_config("[detection]\nreference = { sharp = \"pinnacle\" }\n");
    let config = Config::load(file.path()).unwrap();
    assert_eq!(
        config.detection.reference,
        ReferenceSource::Sharp(SportsbookId::from("pinnacle"))
    );
}

#[test]
fn sportsbook_overrides_build_the_policy() {
    let file = write_temp_config(
        r#"
[sportsbooks]
default = "excluded"

[sportsbooks.books]
pinnacle = "included"
"#,
    );
    let config = Config::load(file.path()).unwrap();
    let policy = config.sportsbooks.policy();

    assert!(policy.allows(&SportsbookId::from("pinnacle")));
    assert!(!policy.allows(&SportsbookId::from("draftkings")));
    assert_eq!(
        policy.explicitly_included(),
        vec![SportsbookId::from("pinnacle")]
    );
}
