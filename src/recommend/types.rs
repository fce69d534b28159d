//! Request and response types for the recommendation engine.
//!
//! Requests are value objects validated once at the boundary; the engine
//! assumes it only ever sees validated values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::persona::Persona;

use super::scoring::DimensionScores;

/// Upper bound for `max_recommendations`.
pub const MAX_RECOMMENDATIONS_LIMIT: u8 = 10;

/// Default number of recommendations returned.
pub const DEFAULT_MAX_RECOMMENDATIONS: u8 = 3;

// ─────────────────────────────────────────────────────────────────
// Task
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
    Expert,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
            Complexity::Expert => "expert",
        }
    }

    /// One step lower, saturating at `Simple`.
    pub fn lower(self) -> Self {
        match self {
            Complexity::Simple | Complexity::Moderate => Complexity::Simple,
            Complexity::Complex => Complexity::Moderate,
            Complexity::Expert => Complexity::Complex,
        }
    }

    /// One step higher, saturating at `Expert`.
    pub fn raise(self) -> Self {
        match self {
            Complexity::Simple => Complexity::Moderate,
            Complexity::Moderate => Complexity::Complex,
            Complexity::Complex | Complexity::Expert => Complexity::Expert,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(Complexity::Simple),
            "moderate" => Ok(Complexity::Moderate),
            "complex" => Ok(Complexity::Complex),
            "expert" => Ok(Complexity::Expert),
            _ => Err(format!(
                "Unknown complexity '{}'. Valid: simple, moderate, complex, expert",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }

    pub fn is_pressing(&self) -> bool {
        matches!(self, Urgency::High | Urgency::Critical)
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            "critical" => Ok(Urgency::Critical),
            _ => Err(format!(
                "Unknown urgency '{}'. Valid: low, medium, high, critical",
                s
            )),
        }
    }
}

/// A task to find a persona for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescription {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
}

impl TaskDescription {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            keywords: Vec::new(),
            context: None,
            domain: None,
            complexity: None,
            urgency: None,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::invalid_request("title", "must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(Error::invalid_request("description", "must not be empty"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// Weights
// ─────────────────────────────────────────────────────────────────

/// Relative weights of the five scoring dimensions. They need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    pub keyword_match: f64,
    pub role_alignment: f64,
    pub expertise_match: f64,
    pub context_relevance: f64,
    pub complexity_fit: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            keyword_match: 0.3,
            role_alignment: 0.25,
            expertise_match: 0.2,
            context_relevance: 0.15,
            complexity_fit: 0.1,
        }
    }
}

impl ScoringWeights {
    /// Build a validated weight set.
    pub fn new(
        keyword_match: f64,
        role_alignment: f64,
        expertise_match: f64,
        context_relevance: f64,
        complexity_fit: f64,
    ) -> Result<Self> {
        let weights = Self {
            keyword_match,
            role_alignment,
            expertise_match,
            context_relevance,
            complexity_fit,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// `(field name, weight)` pairs in dimension order.
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("keywordMatch", self.keyword_match),
            ("roleAlignment", self.role_alignment),
            ("expertiseMatch", self.expertise_match),
            ("contextRelevance", self.context_relevance),
            ("complexityFit", self.complexity_fit),
        ]
    }

    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, w)| w).sum()
    }

    pub fn validate(&self) -> Result<()> {
        for (field, weight) in self.entries() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::invalid_request(
                    field,
                    format!("weight must be a finite, non-negative number (got {})", weight),
                ));
            }
        }
        if self.total() <= 0.0 {
            return Err(Error::invalid_request(
                "scoringWeights",
                "at least one weight must be positive",
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub task: TaskDescription,
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: u8,
    #[serde(default = "default_true")]
    pub include_reasoning: bool,
}

fn default_max_recommendations() -> u8 {
    DEFAULT_MAX_RECOMMENDATIONS
}

fn default_true() -> bool {
    true
}

impl RecommendationRequest {
    pub fn new(task: TaskDescription) -> Self {
        Self {
            task,
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
            include_reasoning: true,
        }
    }

    pub fn with_max_recommendations(mut self, max: u8) -> Self {
        self.max_recommendations = max;
        self
    }

    pub fn with_reasoning(mut self, include: bool) -> Self {
        self.include_reasoning = include;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.task.validate()?;
        if !(1..=MAX_RECOMMENDATIONS_LIMIT).contains(&self.max_recommendations) {
            return Err(Error::invalid_request(
                "maxRecommendations",
                format!(
                    "must be between 1 and {} (got {})",
                    MAX_RECOMMENDATIONS_LIMIT, self.max_recommendations
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeConstraint {
    Tight,
    Normal,
    Relaxed,
}

impl FromStr for TimeConstraint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tight" => Ok(TimeConstraint::Tight),
            "normal" => Ok(TimeConstraint::Normal),
            "relaxed" => Ok(TimeConstraint::Relaxed),
            _ => Err(format!(
                "Unknown time constraint '{}'. Valid: tight, normal, relaxed",
                s
            )),
        }
    }
}

/// Situational hints for contextual recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationContext {
    #[serde(default)]
    pub time_constraint: Option<TimeConstraint>,
    #[serde(default)]
    pub priority: Option<Urgency>,
    #[serde(default)]
    pub project_phase: Option<String>,
    #[serde(default)]
    pub max_recommendations: Option<u8>,
    #[serde(default = "default_true")]
    pub include_reasoning: bool,
}

impl Default for RecommendationContext {
    fn default() -> Self {
        Self {
            time_constraint: None,
            priority: None,
            project_phase: None,
            max_recommendations: None,
            include_reasoning: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaRecommendation {
    pub persona_id: String,
    pub score: f64,
    pub reasoning: String,
    pub strengths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limitations: Option<Vec<String>>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub recommendations: Vec<PersonaRecommendation>,
    pub total_personas_evaluated: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaFitExplanation {
    pub persona: Persona,
    pub recommendation: PersonaRecommendation,
    pub dimensions: DimensionScores,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub version: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_personas: usize,
    pub available_roles: Vec<String>,
    pub scoring_weights: ScoringWeights,
    pub system_info: SystemInfo,
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let w = ScoringWeights::default();
        assert!((w.total() - 1.0).abs() < 1e-9);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_weights_reject_negative_nan_and_all_zero() {
        assert!(ScoringWeights::new(-0.1, 0.2, 0.2, 0.2, 0.2).is_err());
        assert!(ScoringWeights::new(f64::NAN, 0.2, 0.2, 0.2, 0.2).is_err());
        assert!(ScoringWeights::new(0.0, 0.0, 0.0, 0.0, 0.0).is_err());
        assert!(ScoringWeights::new(1.0, 0.0, 0.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_task_validation() {
        assert!(TaskDescription::new("Title", "Body").validate().is_ok());

        let err = TaskDescription::new("  ", "Body").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { ref field, .. } if field == "title"));

        let err = TaskDescription::new("Title", "").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { ref field, .. } if field == "description"));
    }

    #[test]
    fn test_request_bounds() {
        let task = TaskDescription::new("t", "d");
        assert_eq!(
            RecommendationRequest::new(task.clone()).max_recommendations,
            DEFAULT_MAX_RECOMMENDATIONS
        );
        assert!(RecommendationRequest::new(task.clone())
            .with_max_recommendations(0)
            .validate()
            .is_err());
        assert!(RecommendationRequest::new(task.clone())
            .with_max_recommendations(11)
            .validate()
            .is_err());
        assert!(RecommendationRequest::new(task)
            .with_max_recommendations(10)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_complexity_steps_saturate() {
        assert_eq!(Complexity::Simple.lower(), Complexity::Simple);
        assert_eq!(Complexity::Expert.raise(), Complexity::Expert);
        assert_eq!(Complexity::Moderate.raise().lower(), Complexity::Moderate);
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("Complex".parse::<Complexity>().unwrap(), Complexity::Complex);
        assert_eq!("critical".parse::<Urgency>().unwrap(), Urgency::Critical);
        assert!("urgent".parse::<Urgency>().is_err());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let json = r#"{"task":{"title":"t","description":"d","complexity":"expert"}}"#;
        let request: RecommendationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.max_recommendations, 3);
        assert!(request.include_reasoning);
        assert_eq!(request.task.complexity, Some(Complexity::Expert));
    }

    #[test]
    fn test_context_keeps_reasoning_unless_disabled() {
        let context: RecommendationContext = serde_json::from_str(r#"{"priority":"high"}"#).unwrap();
        assert!(context.include_reasoning);
        assert_eq!(context.priority, Some(Urgency::High));
        assert!(RecommendationContext::default().include_reasoning);

        let context: RecommendationContext =
            serde_json::from_str(r#"{"includeReasoning":false}"#).unwrap();
        assert!(!context.include_reasoning);
    }
}
