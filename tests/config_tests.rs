//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides

mod common;

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use common::{invalid_config_fixture, valid_config_fixture};
use personas_server::config::ServerConfig;

/// Test fixture for configuration testing
struct ConfigFixture {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self {
            temp_dir,
            config_path,
        }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    /// Binary invocation isolated from the caller's home and environment
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("personas-server").unwrap();
        cmd.current_dir(self.temp_dir.path())
            .env("HOME", self.temp_dir.path())
            .env("XDG_CONFIG_HOME", self.temp_dir.path().join("xdg"))
            .env_remove("PERSONAS_CONFIG")
            .env_remove("PERSONAS_USER_DIR")
            .env_remove("PERSONAS_PROJECT_DIR")
            .env_remove("PERSONAS_WATCH")
            .env_remove("PERSONAS_DEBOUNCE_MS")
            .env_remove("PERSONAS_EVENT_CAPACITY")
            .env_remove("PERSONAS_MAX_RECOMMENDATIONS")
            .env_remove("PERSONAS_LOG_LEVEL");
        cmd
    }
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[registry]

[scoring]

[logging]
"#,
    );

    fixture
        .cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_valid_fixture() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .args(["config", "validate", "--config"])
        .arg(valid_config_fixture())
        .assert()
        .success();
}

#[test]
fn test_valid_fixture_parses_every_section() {
    let config = ServerConfig::from_file(&valid_config_fixture()).unwrap();

    assert_eq!(config.registry.user_dir, "");
    assert!(!config.registry.watch);
    assert_eq!(config.registry.debounce_ms, 250);
    assert_eq!(config.scoring.max_recommendations, 4);
    assert_eq!(config.logging.level, "warn");

    let options = config.registry.to_options();
    assert!(options.user_dir.is_none());
    assert!(options.project_dir.is_some());

    let weights = config.scoring.weights().unwrap();
    assert_eq!(weights.keyword_match, 0.4);
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_fixture() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .args(["config", "validate", "--config"])
        .arg(invalid_config_fixture())
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("debounce_ms"));
}

#[test]
fn test_negative_weight() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[scoring]
role_alignment = -0.5
"#,
    );

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("roleAlignment"));
}

#[test]
fn test_all_weights_zero() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[scoring]
keyword_match = 0.0
role_alignment = 0.0
expertise_match = 0.0
context_relevance = 0.0
complexity_fit = 0.0
"#,
    );

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .code(10);
}

#[test]
fn test_max_recommendations_out_of_range() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[scoring]
max_recommendations = 11
"#,
    );

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_recommendations"));
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[logging]
level = "loud"
"#,
    );

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[registry\nwatch = ");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .code(10);
}

// ─────────────────────────────────────────────────────────────────
// Config Show Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_custom() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .args(["config", "show", "--config"])
        .arg(valid_config_fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("[registry]"))
        .stdout(predicate::str::contains("debounce_ms = 250"))
        .stdout(predicate::str::contains("max_recommendations = 4"));
}

#[test]
fn test_config_found_in_working_directory() {
    let fixture = ConfigFixture::new();
    fs::write(
        fixture.temp_dir.path().join("personas-server.toml"),
        "[registry]\ndebounce_ms = 1234\n",
    )
    .unwrap();

    fixture
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("debounce_ms = 1234"));
}

// ─────────────────────────────────────────────────────────────────
// Config Init Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_creates_file() {
    let fixture = ConfigFixture::new();
    let target = fixture.temp_dir.path().join("nested").join("server.toml");

    fixture
        .cmd()
        .args(["config", "init", "--path"])
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file created"));

    assert!(target.exists());
    let written = ServerConfig::from_file(&target).unwrap();
    assert!(written.validate().is_ok());
}

#[test]
fn test_config_init_refuses_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("# existing\n");

    fixture
        .cmd()
        .args(["config", "init", "--path", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&fixture.config_path).unwrap(), "# existing\n");
}

#[test]
fn test_config_init_force_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("# existing\n");

    fixture
        .cmd()
        .args(["config", "init", "--force", "--path", fixture.path()])
        .assert()
        .success();

    let content = fs::read_to_string(&fixture.config_path).unwrap();
    assert!(content.contains("[registry]"));
}

#[test]
fn test_config_init_default_location() {
    let fixture = ConfigFixture::new();
    fixture.cmd().args(["config", "init"]).assert().success();

    assert!(fixture
        .temp_dir
        .path()
        .join(".personas")
        .join("server.toml")
        .exists());
}

// ─────────────────────────────────────────────────────────────────
// Environment Variable Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_override_debounce() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .env("PERSONAS_DEBOUNCE_MS", "900")
        .args(["config", "show", "--config"])
        .arg(valid_config_fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("debounce_ms = 900"));
}

#[test]
fn test_env_override_disables_watch() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .env("PERSONAS_WATCH", "false")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("watch = false"));
}

#[test]
fn test_env_config_path() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .env("PERSONAS_CONFIG", valid_config_fixture())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_recommendations = 4"));
}

// ─────────────────────────────────────────────────────────────────
// Path Expansion Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_tilde_expansion() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[registry]
user_dir = "~/my-personas"
"#,
    );

    fixture
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("~/my-personas").not());
}
