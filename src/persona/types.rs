//! Core types for the persona system.
//!
//! A persona is a structured behavioral prompt template. Documents are loaded
//! from three source tiers and every loaded document is either a valid
//! persona or an invalid record carrying its diagnostics.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role reported for documents that failed to load.
pub const INVALID_ROLE: &str = "invalid";

/// Version assumed when a document does not declare one.
pub const DEFAULT_DOCUMENT_VERSION: &str = "1.0";

// ─────────────────────────────────────────────────────────────────
// Source Tier
// ─────────────────────────────────────────────────────────────────

/// Where a persona document came from. Ordered by precedence, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    /// Compiled into the binary.
    Default,
    /// User override directory (e.g. ~/.personas).
    User,
    /// Project override directory (e.g. ./.personas).
    Project,
}

impl SourceTier {
    /// Slug used in logs and JSON output.
    pub fn slug(&self) -> &'static str {
        match self {
            SourceTier::Default => "default",
            SourceTier::User => "user",
            SourceTier::Project => "project",
        }
    }

    /// All tiers in merge order (lowest precedence first).
    pub fn all() -> &'static [SourceTier] {
        &[SourceTier::Default, SourceTier::User, SourceTier::Project]
    }
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for SourceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" | "builtin" => Ok(SourceTier::Default),
            "user" => Ok(SourceTier::User),
            "project" => Ok(SourceTier::Project),
            _ => Err(format!(
                "Unknown source tier '{}'. Valid: default, user, project",
                s
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona (document content)
// ─────────────────────────────────────────────────────────────────

/// Structured behavioral prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub role: String,
    pub core: PersonaCore,
    pub behavior: PersonaBehavior,
    pub expertise: PersonaExpertise,
    pub decision_criteria: Vec<String>,
    pub examples: Vec<String>,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behavior_diagrams: Vec<BehaviorDiagram>,
}

/// Identity narrative, objective and hard constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaCore {
    pub identity: String,
    pub primary_objective: String,
    pub constraints: Vec<String>,
}

/// How the persona thinks and works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaBehavior {
    pub mindset: Vec<String>,
    pub methodology: Vec<String>,
    pub priorities: Vec<String>,
    pub anti_patterns: Vec<String>,
}

/// Knowledge areas used by the recommendation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaExpertise {
    pub domains: Vec<String>,
    pub skills: Vec<String>,
}

/// Optional mermaid diagram describing part of the persona's behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorDiagram {
    pub title: String,
    pub diagram_type: DiagramType,
    pub mermaid_diagram: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagramType {
    Flowchart,
    DecisionTree,
    State,
    Sequence,
}

impl DiagramType {
    pub const ALLOWED: &'static [&'static str] = &["flowchart", "decision-tree", "state", "sequence"];
}

// ─────────────────────────────────────────────────────────────────
// Document metadata
// ─────────────────────────────────────────────────────────────────

/// Authoring metadata that may accompany a persona document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CatalogMetadata>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            version: default_version(),
            author: None,
            created: None,
            updated: None,
            dependencies: Vec::new(),
            extends: None,
            metadata: None,
        }
    }
}

fn default_version() -> String {
    DEFAULT_DOCUMENT_VERSION.to_string()
}

/// Catalog information nested under `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALLOWED: &'static [&'static str] = &["beginner", "intermediate", "advanced"];
}

/// A full persona document: persona content plus authoring metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDocument {
    #[serde(flatten)]
    pub persona: Persona,
    #[serde(flatten)]
    pub meta: DocumentMetadata,
}

impl PersonaDocument {
    /// Declared difficulty, if the document carries catalog metadata.
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.meta.metadata.as_ref().and_then(|m| m.difficulty)
    }
}

// ─────────────────────────────────────────────────────────────────
// Loaded persona (provenance + validity)
// ─────────────────────────────────────────────────────────────────

/// Provenance of a loaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSource {
    pub tier: SourceTier,
    /// `None` for compiled-in defaults.
    pub file_path: Option<PathBuf>,
    pub last_modified: DateTime<Utc>,
}

impl PersonaSource {
    pub fn builtin() -> Self {
        Self {
            tier: SourceTier::Default,
            file_path: None,
            last_modified: Utc::now(),
        }
    }
}

/// Outcome of loading one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LoadedPersona {
    Valid {
        document: PersonaDocument,
        source: PersonaSource,
    },
    Invalid {
        /// File stem of the failing document.
        id: String,
        source: PersonaSource,
        errors: Vec<String>,
    },
}

impl LoadedPersona {
    pub fn id(&self) -> &str {
        match self {
            LoadedPersona::Valid { document, .. } => &document.persona.id,
            LoadedPersona::Invalid { id, .. } => id,
        }
    }

    pub fn name(&self) -> String {
        match self {
            LoadedPersona::Valid { document, .. } => document.persona.name.clone(),
            LoadedPersona::Invalid { id, .. } => format!("Invalid Persona ({})", id),
        }
    }

    pub fn role(&self) -> &str {
        match self {
            LoadedPersona::Valid { document, .. } => &document.persona.role,
            LoadedPersona::Invalid { .. } => INVALID_ROLE,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, LoadedPersona::Valid { .. })
    }

    pub fn source(&self) -> &PersonaSource {
        match self {
            LoadedPersona::Valid { source, .. } | LoadedPersona::Invalid { source, .. } => source,
        }
    }

    pub fn tier(&self) -> SourceTier {
        self.source().tier
    }

    /// Empty for valid records, never empty for invalid ones.
    pub fn validation_errors(&self) -> &[String] {
        match self {
            LoadedPersona::Valid { .. } => &[],
            LoadedPersona::Invalid { errors, .. } => errors,
        }
    }

    pub fn persona(&self) -> Option<&Persona> {
        self.document().map(|d| &d.persona)
    }

    pub fn document(&self) -> Option<&PersonaDocument> {
        match self {
            LoadedPersona::Valid { document, .. } => Some(document),
            LoadedPersona::Invalid { .. } => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
