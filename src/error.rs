//! Error types for the personas server
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI
//!
//! Most persona-level failures never surface as `Error` values to callers:
//! the loader folds them into invalid registry records instead.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,
    DirectoryUnavailable = 204,

    // Persona / document errors (3xx)
    PersonaNotFound = 300,
    DocumentRead = 301,
    DocumentParse = 302,
    SchemaValidation = 303,

    // Request validation errors (4xx)
    InvalidRequest = 400,

    // Watcher errors (5xx)
    WatcherFailed = 500,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Persona errors
            400..=499 => 40, // Request errors
            500..=599 => 50, // Watcher errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the server
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Override directory missing or unreadable
    #[error("Persona directory unavailable: {path}")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    // ─────────────────────────────────────────────────────────────
    // Persona / Document Errors
    // ─────────────────────────────────────────────────────────────

    /// No valid persona with this id
    #[error("Persona not found: {id}")]
    PersonaNotFound { id: String },

    /// Persona document could not be read
    #[error("Failed to read persona document {path}: {message}")]
    DocumentRead { path: PathBuf, message: String },

    /// Persona document is not well-formed YAML
    #[error("Failed to parse persona document {path}: {message}")]
    DocumentParse { path: PathBuf, message: String },

    /// Persona document violates the schema
    #[error("Persona document {path} failed validation ({} errors)", errors.len())]
    SchemaValidation { path: PathBuf, errors: Vec<String> },

    // ─────────────────────────────────────────────────────────────
    // Request Errors
    // ─────────────────────────────────────────────────────────────

    /// A request value failed validation at the boundary
    #[error("Invalid request field '{field}': {message}")]
    InvalidRequest { field: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Watcher Errors
    // ─────────────────────────────────────────────────────────────

    /// Filesystem watcher could not be set up
    #[error("Filesystem watcher error: {message}")]
    Watcher {
        message: String,
        path: Option<PathBuf>,
    },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::Json(_) => ErrorCode::InternalError,
            Error::DirectoryUnavailable { .. } => ErrorCode::DirectoryUnavailable,

            Error::PersonaNotFound { .. } => ErrorCode::PersonaNotFound,
            Error::DocumentRead { .. } => ErrorCode::DocumentRead,
            Error::DocumentParse { .. } => ErrorCode::DocumentParse,
            Error::SchemaValidation { .. } => ErrorCode::SchemaValidation,

            Error::InvalidRequest { .. } => ErrorCode::InvalidRequest,

            Error::Watcher { .. } => ErrorCode::WatcherFailed,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the failure only affects one document or tier and the
    /// registry build carries on without it
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DirectoryUnavailable { .. }
                | Error::DocumentRead { .. }
                | Error::DocumentParse { .. }
                | Error::SchemaValidation { .. }
                | Error::PersonaNotFound { .. }
        )
    }

    /// Check if the error is fatal (server should exit)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::Internal(_)
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'personas-server config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'personas-server config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values. See documentation for valid options."
            ),
            Error::DirectoryUnavailable { .. } => Some(
                "Create the directory or fix its permissions. Personas from this tier are skipped until then."
            ),
            Error::PersonaNotFound { .. } => Some(
                "Run 'personas-server list' to see the available persona ids."
            ),
            Error::DocumentParse { .. } => Some(
                "Fix the YAML syntax of the persona document. Run 'personas-server validate <file>' for details."
            ),
            Error::SchemaValidation { .. } => Some(
                "Fix the listed fields of the persona document. Run 'personas-server validate <file>' for details."
            ),
            Error::InvalidRequest { .. } => Some(
                "Title and description are required; max recommendations must be between 1 and 10."
            ),
            Error::Watcher { .. } => Some(
                "Live reload is unavailable. Check the inotify watch limit or disable watching in the config."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Error::SchemaValidation { errors, .. } = self {
            for message in errors {
                output.push_str(&format!("  - {}\n", message));
            }
        }

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        let code = self.code();
        format!("[{}] {}", code.as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a persona not found error
    pub fn persona_not_found(id: impl Into<String>) -> Self {
        Error::PersonaNotFound { id: id.into() }
    }

    /// Create a request validation error
    pub fn invalid_request(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidRequest {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a watcher error
    pub fn watcher(message: impl Into<String>) -> Self {
        Error::Watcher {
            message: message.into(),
            path: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::PersonaNotFound.as_str(), "E300");
        assert_eq!(ErrorCode::InternalError.as_str(), "E900");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::ConfigNotFound.exit_code(), 10);
        assert_eq!(ErrorCode::IoRead.exit_code(), 20);
        assert_eq!(ErrorCode::SchemaValidation.exit_code(), 30);
        assert_eq!(ErrorCode::InvalidRequest.exit_code(), 40);
        assert_eq!(ErrorCode::WatcherFailed.exit_code(), 50);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_error_display() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/path/to/config.toml"),
            source: None,
        };
        assert!(err.to_string().contains("/path/to/config.toml"));

        let err = Error::SchemaValidation {
            path: PathBuf::from("bad.yaml"),
            errors: vec!["core: Required".into(), "tags: Required".into()],
        };
        assert!(err.to_string().contains("2 errors"));
    }

    #[test]
    fn test_error_codes() {
        let err = Error::config_not_found("/test");
        assert_eq!(err.code(), ErrorCode::ConfigNotFound);

        let err = Error::persona_not_found("ghost");
        assert_eq!(err.code(), ErrorCode::PersonaNotFound);

        let err = Error::invalid_request("title", "must not be empty");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_error_recoverable() {
        assert!(Error::persona_not_found("x").is_recoverable());
        assert!(Error::DirectoryUnavailable {
            path: PathBuf::from("/missing"),
            source: None
        }
        .is_recoverable());
        assert!(!Error::config_not_found("/test").is_recoverable());
        assert!(!Error::Internal("boom".into()).is_recoverable());
    }

    #[test]
    fn test_error_fatal() {
        assert!(Error::config_not_found("/test").is_fatal());
        assert!(!Error::persona_not_found("x").is_fatal());
        assert!(!Error::watcher("no inotify").is_fatal());
    }

    #[test]
    fn test_error_suggestions() {
        let err = Error::config_not_found("/test");
        assert!(err.suggestion().unwrap().contains("config init"));

        let err = Error::persona_not_found("ghost");
        assert!(err.suggestion().unwrap().contains("list"));
    }

    #[test]
    fn test_format_for_terminal_lists_schema_errors() {
        let err = Error::SchemaValidation {
            path: PathBuf::from("bad.yaml"),
            errors: vec!["core: Required".into()],
        };
        let formatted = err.format_for_terminal();

        assert!(formatted.contains("E303"));
        assert!(formatted.contains("  - core: Required"));
        assert!(formatted.contains("Hint"));
    }

    #[test]
    fn test_format_for_log() {
        let err = Error::config_not_found("/test/config.toml");
        let formatted = err.format_for_log();

        assert!(formatted.contains("[E100]"));
        assert!(!formatted.contains("\x1b["));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        assert_eq!(err.code(), ErrorCode::IoNotFound);
    }
}
