//! Compiled-in default personas.
//!
//! The documents live under `config/personas/` and go through the same
//! loader and schema as override files.

use super::loader::load_persona_str;
use super::types::{LoadedPersona, PersonaSource};

const BUNDLED: &[(&str, &str)] = &[
    ("architect.yaml", include_str!("../../config/personas/architect.yaml")),
    ("developer.yaml", include_str!("../../config/personas/developer.yaml")),
    ("reviewer.yaml", include_str!("../../config/personas/reviewer.yaml")),
    ("debugger.yaml", include_str!("../../config/personas/debugger.yaml")),
    ("optimizer.yaml", include_str!("../../config/personas/optimizer.yaml")),
    (
        "security-analyst.yaml",
        include_str!("../../config/personas/security-analyst.yaml"),
    ),
    ("tester.yaml", include_str!("../../config/personas/tester.yaml")),
    (
        "technical-writer.yaml",
        include_str!("../../config/personas/technical-writer.yaml"),
    ),
];

/// Bundled `(file name, YAML)` pairs in registry order.
pub fn bundled_documents() -> &'static [(&'static str, &'static str)] {
    BUNDLED
}

/// Load every bundled document as a default-tier record.
pub fn load_defaults() -> Vec<LoadedPersona> {
    BUNDLED
        .iter()
        .map(|(name, content)| load_persona_str(content, name, PersonaSource::builtin()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::types::SourceTier;
    use std::collections::HashSet;

    #[test]
    fn test_all_bundled_personas_are_valid() {
        for loaded in load_defaults() {
            assert!(
                loaded.is_valid(),
                "bundled persona {} is invalid: {:?}",
                loaded.id(),
                loaded.validation_errors()
            );
            assert_eq!(loaded.tier(), SourceTier::Default);
            assert!(loaded.source().file_path.is_none());
        }
    }

    #[test]
    fn test_bundled_ids_match_file_names_and_are_unique() {
        let mut seen = HashSet::new();
        for (loaded, (name, _)) in load_defaults().iter().zip(bundled_documents()) {
            assert_eq!(format!("{}.yaml", loaded.id()), *name);
            assert!(seen.insert(loaded.id().to_string()));
        }
        assert_eq!(seen.len(), bundled_documents().len());
    }

    #[test]
    fn test_bundled_set_contains_core_roles() {
        let ids: Vec<String> = load_defaults().iter().map(|p| p.id().to_string()).collect();
        for id in ["architect", "developer", "reviewer"] {
            assert!(ids.iter().any(|i| i == id), "missing {}", id);
        }
    }
}
