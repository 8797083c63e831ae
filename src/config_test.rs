// Unit tests for configuration loading

use super::*;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

const ALL_VARS: [&str; 5] = [
    ENV_SCRIPT_TIMEOUT_MS,
    ENV_PAGE_SETTLE_MS,
    ENV_EVENT_POLL_MS,
    ENV_BYPASS_FRAME_RESET,
    ENV_WEBDRIVER_URL,
];

fn clear_env() {
    for var in ALL_VARS {
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::remove_var(var) };
    }
}

fn set_env(name: &str, value: &str) {
    // SAFETY: env-mutating tests are serialized
    unsafe { std::env::set_var(name, value) };
}

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.script_timeout(), Duration::from_secs(10));
    assert_eq!(config.event_poll_interval(), Duration::from_millis(500));
    assert_eq!(config.page_settle(), Duration::from_secs(2));
    assert!(!config.bypass_frame_reset);
    assert_eq!(config.grammar, Grammar::default());
}

#[test]
#[serial]
fn test_load_partial_file_keeps_other_defaults() {
    clear_env();
    let file = write_config(
        r#"
script_timeout_ms = 2500

[grammar]
child_separator = ">>"

[class_types]
"acme.Grid" = "Table"
"#,
    );

    let config = EngineConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.script_timeout_ms, 2500);
    assert_eq!(config.page_settle_ms, 2_000);
    assert_eq!(config.grammar.child_separator, ">>");
    assert_eq!(config.grammar.qualifier_separator, ";");
    assert_eq!(config.class_types.get("acme.Grid").map(String::as_str), Some("Table"));
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let file = write_config("page_settle_ms = 100\nbypass_frame_reset = false\n");
    set_env(ENV_PAGE_SETTLE_MS, "0");
    set_env(ENV_BYPASS_FRAME_RESET, "yes");
    set_env(ENV_WEBDRIVER_URL, " http://localhost:9515 ");
    set_env(ENV_SCRIPT_TIMEOUT_MS, "soon");

    let config = EngineConfig::load(Some(file.path())).unwrap();
    clear_env();

    assert_eq!(config.page_settle_ms, 0);
    assert!(config.bypass_frame_reset);
    assert_eq!(config.webdriver_url.as_deref(), Some("http://localhost:9515"));
    assert_eq!(config.script_timeout_ms, 10_000);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    clear_env();
    let err = EngineConfig::load(Some(Path::new("/nonexistent/rsprobe.toml"))).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_invalid_toml_is_error() {
    let file = write_config("script_timeout_ms = \"ten\"");
    let err = EngineConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Invalid config file"));
}
