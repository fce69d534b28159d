//! Configuration system for the personas server
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (PERSONAS_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::persona::RegistryOptions;
use crate::recommend::types::{ScoringWeights, MAX_RECOMMENDATIONS_LIMIT};

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "personas-server.toml";

/// Main server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Persona sources and live reload
    pub registry: RegistrySettings,

    /// Recommendation scoring
    pub scoring: ScoringSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Persona source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// User override directory (empty = disabled)
    pub user_dir: String,

    /// Project override directory (empty = disabled)
    pub project_dir: String,

    /// Rebuild when override directories change
    pub watch: bool,

    /// Quiet period before a rebuild, in milliseconds
    pub debounce_ms: u64,

    /// Pending change notifications kept before dropping
    pub event_capacity: usize,
}

/// Scoring weights and response size
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub keyword_match: f64,
    pub role_alignment: f64,
    pub expertise_match: f64,
    pub context_relevance: f64,
    pub complexity_fit: f64,

    /// Default number of recommendations (1-10)
    pub max_recommendations: u8,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// How often the log file rolls over
    pub rotation: LogRotation,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

/// Log file rollover period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

// Default implementations

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            user_dir: "~/.personas".to_string(),
            project_dir: "./.personas".to_string(),
            watch: true,
            debounce_ms: 300,
            event_capacity: 64,
        }
    }
}

impl Default for ScoringSettings {
    fn default() -> Self {
        let weights = ScoringWeights::default();
        Self {
            keyword_match: weights.keyword_match,
            role_alignment: weights.role_alignment,
            expertise_match: weights.expertise_match,
            context_relevance: weights.context_relevance,
            complexity_fit: weights.complexity_fit,
            max_recommendations: 3,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            rotation: LogRotation::Daily,
            max_files: 5,
            json_format: false,
        }
    }
}

impl RegistrySettings {
    /// Registry options for these settings.
    pub fn to_options(&self) -> RegistryOptions {
        RegistryOptions {
            user_dir: optional_dir(&self.user_dir),
            project_dir: optional_dir(&self.project_dir),
            watch: self.watch,
            debounce: Duration::from_millis(self.debounce_ms),
            event_capacity: self.event_capacity,
        }
    }
}

impl ScoringSettings {
    /// Configured weights as a validated set.
    pub fn weights(&self) -> Result<ScoringWeights> {
        ScoringWeights::new(
            self.keyword_match,
            self.role_alignment,
            self.expertise_match,
            self.context_relevance,
            self.complexity_fit,
        )
        .map_err(|e| Error::config_field_invalid("scoring", e.to_string()))
    }
}

fn optional_dir(dir: &str) -> Option<PathBuf> {
    let trimmed = dir.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

impl ServerConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        let config_file = Self::find_config_file(config_path)?;
        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading configuration file");
            config = Self::from_file(&path)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })
    }

    /// Find the configuration file to use
    pub fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        // Search in standard locations
        let search_paths = [
            // Current directory
            Some(PathBuf::from(CONFIG_FILE_NAME)),
            // User config directory
            dirs::config_dir().map(|p| p.join("personas").join("server.toml")),
            // Home directory
            dirs::home_dir().map(|p| p.join(".personas").join("server.toml")),
        ];

        for path in search_paths.iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Registry settings
        if let Ok(val) = std::env::var("PERSONAS_USER_DIR") {
            self.registry.user_dir = val;
        }
        if let Ok(val) = std::env::var("PERSONAS_PROJECT_DIR") {
            self.registry.project_dir = val;
        }
        if let Ok(val) = std::env::var("PERSONAS_WATCH") {
            self.registry.watch = parse_bool(&val);
        }
        if let Ok(val) = std::env::var("PERSONAS_DEBOUNCE_MS") {
            if let Ok(n) = val.parse() {
                self.registry.debounce_ms = n;
            }
        }
        if let Ok(val) = std::env::var("PERSONAS_EVENT_CAPACITY") {
            if let Ok(n) = val.parse() {
                self.registry.event_capacity = n;
            }
        }

        // Scoring settings
        if let Ok(val) = std::env::var("PERSONAS_MAX_RECOMMENDATIONS") {
            if let Ok(n) = val.parse() {
                self.scoring.max_recommendations = n;
            }
        }

        // Logging settings
        if let Ok(val) = std::env::var("PERSONAS_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("PERSONAS_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("PERSONAS_LOG_JSON") {
            self.logging.json_format = parse_bool(&val);
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.registry.user_dir = expand_path(&self.registry.user_dir);
        self.registry.project_dir = expand_path(&self.registry.project_dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.registry.debounce_ms == 0 || self.registry.debounce_ms > 60_000 {
            return Err(Error::config_field_invalid(
                "registry.debounce_ms",
                "debounce_ms must be between 1 and 60000",
            ));
        }
        if self.registry.event_capacity == 0 {
            return Err(Error::config_field_invalid(
                "registry.event_capacity",
                "event_capacity must be at least 1",
            ));
        }

        self.scoring.weights()?;
        if !(1..=MAX_RECOMMENDATIONS_LIMIT).contains(&self.scoring.max_recommendations) {
            return Err(Error::config_field_invalid(
                "scoring.max_recommendations",
                format!(
                    "max_recommendations must be between 1 and {}",
                    MAX_RECOMMENDATIONS_LIMIT
                ),
            ));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

fn parse_bool(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location written by `config init`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".personas")
        .join("server.toml")
}

/// Initialize a new configuration file, returning where it was written
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    // Check if file exists
    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    // Create parent directories
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# Personas Server Configuration

[registry]
# User override directory (empty string disables the tier)
user_dir = "~/.personas"

# Project override directory (empty string disables the tier)
project_dir = "./.personas"

# Rebuild the registry when override directories change
watch = true

# Quiet period after the last change before rebuilding (milliseconds)
debounce_ms = 300

# Pending change notifications kept before dropping
event_capacity = 64

[scoring]
# Relative weights; they do not need to sum to 1
keyword_match = 0.3
role_alignment = 0.25
expertise_match = 0.2
context_relevance = 0.15
complexity_fit = 0.1

# Default number of recommendations (1-10)
max_recommendations = 3

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.personas/logs/server.log"

# Log file rollover: hourly, daily, never
rotation = "daily"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
