//! Structural contract for persona documents.
//!
//! Works on the raw YAML tree so that every violation can be reported with
//! its field path, instead of stopping at the first serde error. The check is
//! strict: unknown fields are rejected at every level.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde_yaml::{Mapping, Value};

use super::types::{DiagramType, Difficulty, INVALID_ROLE};

// ─────────────────────────────────────────────────────────────────
// Cardinality bounds
// ─────────────────────────────────────────────────────────────────

/// Inclusive item-count bounds for a string list.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub min: usize,
    pub max: usize,
}

const fn bounds(min: usize, max: usize) -> Bounds {
    Bounds { min, max }
}

pub const CONSTRAINTS: Bounds = bounds(3, 10);
pub const MINDSET: Bounds = bounds(3, 8);
pub const METHODOLOGY: Bounds = bounds(3, 10);
pub const PRIORITIES: Bounds = bounds(3, 8);
pub const ANTI_PATTERNS: Bounds = bounds(3, 8);
pub const DOMAINS: Bounds = bounds(2, 10);
pub const SKILLS: Bounds = bounds(3, 15);
pub const DECISION_CRITERIA: Bounds = bounds(3, 8);
pub const EXAMPLES: Bounds = bounds(1, 5);
pub const TAGS: Bounds = bounds(1, 15);
pub const BEHAVIOR_DIAGRAMS: Bounds = bounds(0, 5);
pub const DEPENDENCIES: Bounds = bounds(0, 20);
pub const CATALOG_LIST: Bounds = bounds(0, 20);

const TOP_LEVEL_FIELDS: &[&str] = &[
    "id",
    "name",
    "role",
    "core",
    "behavior",
    "expertise",
    "decisionCriteria",
    "examples",
    "tags",
    "behaviorDiagrams",
    "version",
    "author",
    "created",
    "updated",
    "dependencies",
    "extends",
    "metadata",
];
const CORE_FIELDS: &[&str] = &["identity", "primaryObjective", "constraints"];
const BEHAVIOR_FIELDS: &[&str] = &["mindset", "methodology", "priorities", "antiPatterns"];
const EXPERTISE_FIELDS: &[&str] = &["domains", "skills"];
const DIAGRAM_FIELDS: &[&str] = &["title", "diagramType", "mermaidDiagram", "description"];
const CATALOG_FIELDS: &[&str] = &["category", "difficulty", "estimatedTime", "prerequisites", "tags"];

// ─────────────────────────────────────────────────────────────────
// Violations
// ─────────────────────────────────────────────────────────────────

/// One failed rule, rendered as `path: message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a parsed document. Returns every violation found.
pub fn validate_document(root: &Value) -> std::result::Result<(), Vec<SchemaViolation>> {
    let mut checker = Checker::default();

    match root {
        Value::Mapping(map) => checker.document(map),
        _ => checker.push("(root)", "Expected an object"),
    }

    if checker.violations.is_empty() {
        Ok(())
    } else {
        Err(checker.violations)
    }
}

// ─────────────────────────────────────────────────────────────────
// Checker
// ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Checker {
    violations: Vec<SchemaViolation>,
}

impl Checker {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(SchemaViolation {
            path: path.into(),
            message: message.into(),
        });
    }

    fn document(&mut self, map: &Mapping) {
        self.unknown_fields(map, "", TOP_LEVEL_FIELDS);

        if let Some(id) = self.required_string(map, "id", "") {
            if !is_slug(id) {
                self.push("id", "Must be a lowercase slug (a-z, 0-9, '-')");
            }
        }
        self.required_string(map, "name", "");
        if let Some(role) = self.required_string(map, "role", "") {
            if role.trim().eq_ignore_ascii_case(INVALID_ROLE) {
                self.push("role", format!("'{}' is a reserved role", INVALID_ROLE));
            }
        }

        if let Some(core) = self.required_object(map, "core", "", CORE_FIELDS) {
            self.required_string(core, "identity", "core");
            self.required_string(core, "primaryObjective", "core");
            self.string_list(core, "constraints", "core", CONSTRAINTS, true);
        }

        if let Some(behavior) = self.required_object(map, "behavior", "", BEHAVIOR_FIELDS) {
            self.string_list(behavior, "mindset", "behavior", MINDSET, true);
            self.string_list(behavior, "methodology", "behavior", METHODOLOGY, true);
            self.string_list(behavior, "priorities", "behavior", PRIORITIES, true);
            self.string_list(behavior, "antiPatterns", "behavior", ANTI_PATTERNS, true);
        }

        if let Some(expertise) = self.required_object(map, "expertise", "", EXPERTISE_FIELDS) {
            self.string_list(expertise, "domains", "expertise", DOMAINS, true);
            self.string_list(expertise, "skills", "expertise", SKILLS, true);
        }

        self.string_list(map, "decisionCriteria", "", DECISION_CRITERIA, true);
        self.string_list(map, "examples", "", EXAMPLES, true);
        self.string_list(map, "tags", "", TAGS, true);
        self.behavior_diagrams(map);

        self.optional_string(map, "version", "");
        self.optional_string(map, "author", "");
        self.timestamp(map, "created");
        self.timestamp(map, "updated");
        self.string_list(map, "dependencies", "", DEPENDENCIES, false);
        if let Some(parent) = self.optional_string(map, "extends", "") {
            if !is_slug(parent) {
                self.push("extends", "Must be a lowercase slug (a-z, 0-9, '-')");
            }
        }
        self.catalog_metadata(map);
    }

    fn behavior_diagrams(&mut self, map: &Mapping) {
        let Some(value) = present(map, "behaviorDiagrams") else {
            return;
        };
        let Value::Sequence(items) = value else {
            self.push("behaviorDiagrams", "Expected a list");
            return;
        };
        self.check_len("behaviorDiagrams", items.len(), BEHAVIOR_DIAGRAMS);

        for (index, item) in items.iter().enumerate() {
            let path = format!("behaviorDiagrams[{}]", index);
            let Value::Mapping(diagram) = item else {
                self.push(path, "Expected an object");
                continue;
            };
            self.unknown_fields(diagram, &path, DIAGRAM_FIELDS);
            self.required_string(diagram, "title", &path);
            self.required_string(diagram, "mermaidDiagram", &path);
            self.optional_string(diagram, "description", &path);
            if let Some(kind) = self.required_string(diagram, "diagramType", &path) {
                self.one_of(&join(&path, "diagramType"), kind, DiagramType::ALLOWED);
            }
        }
    }

    fn catalog_metadata(&mut self, map: &Mapping) {
        let Some(value) = present(map, "metadata") else {
            return;
        };
        let Value::Mapping(catalog) = value else {
            self.push("metadata", "Expected an object");
            return;
        };
        self.unknown_fields(catalog, "metadata", CATALOG_FIELDS);
        self.optional_string(catalog, "category", "metadata");
        self.optional_string(catalog, "estimatedTime", "metadata");
        if let Some(difficulty) = self.optional_string(catalog, "difficulty", "metadata") {
            self.one_of("metadata.difficulty", difficulty, Difficulty::ALLOWED);
        }
        self.string_list(catalog, "prerequisites", "metadata", CATALOG_LIST, false);
        self.string_list(catalog, "tags", "metadata", CATALOG_LIST, false);
    }

    fn timestamp(&mut self, map: &Mapping, key: &str) {
        if let Some(raw) = self.optional_string(map, key, "") {
            let trimmed = raw.trim();
            let parses = DateTime::parse_from_rfc3339(trimmed).is_ok()
                || NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok();
            if !parses {
                self.push(key, "Expected an ISO-8601 timestamp");
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Primitive rules
    // ─────────────────────────────────────────────────────────────

    fn unknown_fields(&mut self, map: &Mapping, path: &str, allowed: &[&str]) {
        for (key, _) in map.iter() {
            match key.as_str() {
                Some(name) if allowed.contains(&name) => {}
                Some(name) => self.push(join(path, name), "Unrecognized field"),
                None => self.push(display_path(path), "Field names must be strings"),
            }
        }
    }

    fn required_object<'a>(
        &mut self,
        map: &'a Mapping,
        key: &str,
        path: &str,
        allowed: &[&str],
    ) -> Option<&'a Mapping> {
        let field_path = join(path, key);
        match present(map, key) {
            None => {
                self.push(field_path, "Required");
                None
            }
            Some(Value::Mapping(inner)) => {
                self.unknown_fields(inner, &field_path, allowed);
                Some(inner)
            }
            Some(_) => {
                self.push(field_path, "Expected an object");
                None
            }
        }
    }

    fn required_string<'a>(&mut self, map: &'a Mapping, key: &str, path: &str) -> Option<&'a str> {
        if present(map, key).is_none() {
            self.push(join(path, key), "Required");
            return None;
        }
        self.optional_string(map, key, path)
    }

    fn optional_string<'a>(&mut self, map: &'a Mapping, key: &str, path: &str) -> Option<&'a str> {
        match present(map, key)? {
            Value::String(s) if s.trim().is_empty() => {
                self.push(join(path, key), "Must not be empty");
                None
            }
            Value::String(s) => Some(s.as_str()),
            _ => {
                self.push(join(path, key), "Expected a string");
                None
            }
        }
    }

    fn string_list(&mut self, map: &Mapping, key: &str, path: &str, limits: Bounds, required: bool) {
        let field_path = join(path, key);
        let items = match present(map, key) {
            None if required => {
                self.push(field_path, "Required");
                return;
            }
            None => return,
            Some(Value::Sequence(items)) => items,
            Some(_) => {
                self.push(field_path, "Expected a list");
                return;
            }
        };

        self.check_len(&field_path, items.len(), limits);
        for (index, item) in items.iter().enumerate() {
            match item {
                Value::String(s) if s.trim().is_empty() => {
                    self.push(format!("{}[{}]", field_path, index), "Must not be empty")
                }
                Value::String(_) => {}
                _ => self.push(format!("{}[{}]", field_path, index), "Expected a string"),
            }
        }
    }

    fn check_len(&mut self, path: &str, len: usize, limits: Bounds) {
        if len < limits.min {
            self.push(
                path,
                format!("Expected at least {} items, found {}", limits.min, len),
            );
        } else if len > limits.max {
            self.push(
                path,
                format!("Expected at most {} items, found {}", limits.max, len),
            );
        }
    }

    fn one_of(&mut self, path: &str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            self.push(
                path,
                format!(
                    "Invalid value '{}', expected one of: {}",
                    value,
                    allowed.join(", ")
                ),
            );
        }
    }
}

/// Field value, treating an explicit `null` the same as an absent key.
fn present<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.to_string()
    }
}

fn is_slug(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
id: reviewer
name: Code Reviewer
role: reviewer
core:
  identity: Careful reviewer
  primaryObjective: Catch defects early
  constraints: [Be specific, Be kind, Cite lines]
behavior:
  mindset: [Skeptical, Thorough, Constructive]
  methodology: [Read tests first, Trace data flow, Check edge cases]
  priorities: [Correctness, Clarity, Maintainability]
  antiPatterns: [Nitpicking, Rubber stamping, Vague feedback]
expertise:
  domains: [code quality, testing]
  skills: [code review, refactoring, static analysis]
decisionCriteria: [Is it correct, Is it tested, Is it readable]
examples: [Reviewing a pull request]
tags: [review, quality]
"#;

    fn parse(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn messages(yaml: &str) -> Vec<String> {
        match validate_document(&parse(yaml)) {
            Ok(()) => Vec::new(),
            Err(violations) => violations.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_valid_document_passes() {
        assert!(messages(VALID).is_empty());
    }

    #[test]
    fn test_missing_core_reported_by_path() {
        let yaml = VALID.replace(
            "core:\n  identity: Careful reviewer\n  primaryObjective: Catch defects early\n  constraints: [Be specific, Be kind, Cite lines]\n",
            "",
        );
        let errors = messages(&yaml);
        assert_eq!(errors, vec!["core: Required".to_string()]);
    }

    #[test]
    fn test_cardinality_violations() {
        let yaml = VALID.replace(
            "mindset: [Skeptical, Thorough, Constructive]",
            "mindset: [Skeptical]",
        );
        let errors = messages(&yaml);
        assert_eq!(
            errors,
            vec!["behavior.mindset: Expected at least 3 items, found 1".to_string()]
        );
    }

    #[test]
    fn test_unknown_fields_rejected_at_every_level() {
        let yaml = format!("{}favouriteColour: blue\n", VALID).replace(
            "  skills: [code review, refactoring, static analysis]",
            "  skills: [code review, refactoring, static analysis]\n  hobbies: [chess]",
        );
        let errors = messages(&yaml);
        assert!(errors.contains(&"favouriteColour: Unrecognized field".to_string()));
        assert!(errors.contains(&"expertise.hobbies: Unrecognized field".to_string()));
    }

    #[test]
    fn test_enum_domains() {
        let yaml = format!(
            "{}metadata:\n  difficulty: legendary\nbehaviorDiagrams:\n  - title: Flow\n    diagramType: gantt\n    mermaidDiagram: graph TD\n",
            VALID
        );
        let errors = messages(&yaml);
        assert!(errors.iter().any(|e| e.starts_with("metadata.difficulty: Invalid value 'legendary'")));
        assert!(errors
            .iter()
            .any(|e| e.starts_with("behaviorDiagrams[0].diagramType: Invalid value 'gantt'")));
    }

    #[test]
    fn test_reserved_role_and_bad_slug() {
        let yaml = VALID
            .replace("role: reviewer", "role: invalid")
            .replace("id: reviewer", "id: Code Reviewer");
        let errors = messages(&yaml);
        assert!(errors.contains(&"role: 'invalid' is a reserved role".to_string()));
        assert!(errors.iter().any(|e| e.starts_with("id: Must be a lowercase slug")));
    }

    #[test]
    fn test_element_type_errors_use_index() {
        let yaml = VALID.replace("tags: [review, quality]", "tags: [review, 42, \"\"]");
        let errors = messages(&yaml);
        assert_eq!(
            errors,
            vec![
                "tags[1]: Expected a string".to_string(),
                "tags[2]: Must not be empty".to_string(),
            ]
        );
    }

    #[test]
    fn test_metadata_fields_accepted() {
        let yaml = format!(
            "{}version: \"2.1\"\nauthor: Team\ncreated: 2024-01-15\nupdated: 2024-02-01T10:00:00Z\ndependencies: [developer]\nextends: developer\nmetadata:\n  category: quality\n  difficulty: intermediate\n  estimatedTime: 30m\n  prerequisites: [git]\n  tags: [review]\n",
            VALID
        );
        assert!(messages(&yaml).is_empty());
    }

    #[test]
    fn test_bad_timestamp() {
        let yaml = format!("{}created: last tuesday\n", VALID);
        assert_eq!(
            messages(&yaml),
            vec!["created: Expected an ISO-8601 timestamp".to_string()]
        );
    }

    #[test]
    fn test_non_mapping_root() {
        assert_eq!(messages("- just\n- a list\n"), vec!["(root): Expected an object".to_string()]);
    }
}
