//! Common test utilities and fixtures
//!
//! This module provides shared test infrastructure

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Get the valid config fixture path
pub fn valid_config_fixture() -> PathBuf {
    fixture_path("valid_config.toml")
}

/// Get the invalid config fixture path
pub fn invalid_config_fixture() -> PathBuf {
    fixture_path("invalid_config.toml")
}

/// Text of a bundled persona document
pub fn bundled_yaml(id: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join("personas")
        .join(format!("{}.yaml", id));
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}

/// A minimal document that passes the schema
pub fn persona_yaml(id: &str, role: &str, tags: &[&str]) -> String {
    let tags = tags
        .iter()
        .map(|t| format!("  - {}\n", t))
        .collect::<String>();
    format!(
        r#"id: {id}
name: {id} persona
role: {role}
core:
  identity: A focused {role} used in tests.
  primaryObjective: Exercise the registry.
  constraints:
    - Stay small
    - Stay valid
    - Stay predictable
behavior:
  mindset: [curious, careful, concise]
  methodology: [read, think, act]
  priorities: [correctness, clarity, speed]
  antiPatterns: [guessing, rushing, hiding]
expertise:
  domains: [testing, fixtures]
  skills: [asserting, mocking, isolating]
decisionCriteria: [is it right, is it clear, is it fast]
examples: [Writing a regression test]
tags:
{tags}"#
    )
}

/// User and project override directories in one temp tree
pub struct PersonaDirs {
    pub temp_dir: TempDir,
    pub user: PathBuf,
    pub project: PathBuf,
}

impl PersonaDirs {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let user = temp_dir.path().join("user");
        let project = temp_dir.path().join("project");
        fs::create_dir_all(&user).unwrap();
        fs::create_dir_all(&project).unwrap();
        Self {
            temp_dir,
            user,
            project,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// Write a file, creating parent directories
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Poll `check` until it holds or `timeout` elapses
pub async fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_dir_exists() {
        assert!(fixtures_dir().exists(), "Fixtures directory should exist");
    }

    #[test]
    fn test_valid_config_exists() {
        assert!(
            valid_config_fixture().exists(),
            "Valid config fixture should exist"
        );
    }

    #[test]
    fn test_invalid_config_exists() {
        assert!(
            invalid_config_fixture().exists(),
            "Invalid config fixture should exist"
        );
    }
}
