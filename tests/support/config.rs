use std::io::Write;

use tempfile::NamedTempFile;

/// Write `contents` to a temporary `.toml` file removed on drop.
pub fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("sharpline-config-test-")
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

/// Minimal valid configuration streaming one league.
pub const MINIMAL: &str = r#"
[logging]
level = "info"
format = "compact"

[filters]
sports = ["soccer"]
leagues = ["epl"]
"#;
