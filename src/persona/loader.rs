//! Persona document loader.
//!
//! Reads one document, parses it as YAML, checks it against the schema and
//! deserializes it. Loading is total: every failure becomes an
//! [`LoadedPersona::Invalid`] record so a single bad file cannot block the
//! rest of a tier.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::schema::validate_document;
use super::types::{LoadedPersona, PersonaDocument, PersonaSource, SourceTier};

/// Prefix of the single message reported for syntax errors.
pub const SYNTAX_ERROR_PREFIX: &str = "YAML syntax error";

/// Message reported when the failure does not fit any known category.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error while loading persona";

/// Load a persona document from disk.
pub async fn load_persona_file(path: &Path, tier: SourceTier) -> LoadedPersona {
    let fallback_source = PersonaSource {
        tier,
        file_path: Some(path.to_path_buf()),
        last_modified: Utc::now(),
    };

    match read_document(path, tier).await {
        Ok((document, source)) => {
            debug!(
                id = %document.persona.id,
                tier = %tier,
                path = %path.display(),
                "Persona loaded"
            );
            LoadedPersona::Valid { document, source }
        }
        Err(err) => invalid_record(&stem_of(path), fallback_source, err),
    }
}

/// Load a persona document that is already in memory (compiled-in defaults).
pub fn load_persona_str(content: &str, origin: &str, source: PersonaSource) -> LoadedPersona {
    match parse_document(content, Path::new(origin)) {
        Ok(document) => LoadedPersona::Valid { document, source },
        Err(err) => invalid_record(&stem_of(Path::new(origin)), source, err),
    }
}

/// Load a single file for diagnostics, as if it sat in the project tier.
pub async fn validate_file(path: &Path) -> LoadedPersona {
    load_persona_file(path, SourceTier::Project).await
}

/// Parse and validate document text.
pub fn parse_document(content: &str, path: &Path) -> Result<PersonaDocument> {
    let value: Value = serde_yaml::from_str(content).map_err(|e| Error::DocumentParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    validate_document(&value).map_err(|violations| Error::SchemaValidation {
        path: path.to_path_buf(),
        errors: violations.iter().map(ToString::to_string).collect(),
    })?;

    serde_yaml::from_value(value).map_err(|e| {
        Error::Internal(format!(
            "validated document {} did not deserialize: {}",
            path.display(),
            e
        ))
    })
}

async fn read_document(path: &Path, tier: SourceTier) -> Result<(PersonaDocument, PersonaSource)> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::DocumentRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let last_modified = tokio::fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    let document = parse_document(&content, path)?;
    let source = PersonaSource {
        tier,
        file_path: Some(path.to_path_buf()),
        last_modified,
    };
    Ok((document, source))
}

/// Convert a load failure into diagnostic messages.
pub fn diagnostics(err: &Error) -> Vec<String> {
    match err {
        Error::DocumentRead { message, .. } => vec![format!("Failed to read file: {}", message)],
        Error::DocumentParse { message, .. } => {
            vec![format!("{}: {}", SYNTAX_ERROR_PREFIX, message)]
        }
        Error::SchemaValidation { errors, .. } if !errors.is_empty() => errors.clone(),
        _ => vec![UNKNOWN_ERROR_MESSAGE.to_string()],
    }
}

fn invalid_record(id: &str, source: PersonaSource, err: Error) -> LoadedPersona {
    let errors = diagnostics(&err);
    warn!(
        id = %id,
        tier = %source.tier,
        error = %err.format_for_log(),
        issues = errors.len(),
        "Persona document is invalid"
    );
    LoadedPersona::Invalid {
        id: id.to_string(),
        source,
        errors,
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
