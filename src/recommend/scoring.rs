//! Relevance scoring of a persona against a task.
//!
//! Text is reduced to lowercase alphanumeric tokens. Two tokens match when
//! they are equal or share a long common prefix (`architect` ~
//! `architecture`). Each dimension yields a value in `[0, 1]`; the final
//! score is the weight-normalized sum.

use std::fmt;

use serde::Serialize;

use crate::persona::{Difficulty, Persona};

use super::types::{Complexity, PersonaRecommendation, ScoringWeights, TaskDescription};

const MIN_TOKEN_LEN: usize = 2;
const MIN_SHARED_PREFIX: usize = 4;
const TEXT_COVERAGE_SATURATION: f64 = 5.0;
const LIMITATION_THRESHOLD: f64 = 0.2;
const MAX_STRENGTHS: usize = 5;
const NEUTRAL_FIT: f64 = 0.5;

const STOPWORDS: &[&str] = &[
    "an", "and", "any", "are", "as", "at", "be", "by", "can", "for", "from", "has", "have", "in",
    "into", "is", "it", "its", "of", "on", "or", "our", "should", "that", "the", "their", "this",
    "to", "was", "we", "will", "with", "you", "your",
];

// ─────────────────────────────────────────────────────────────────
// Tokens
// ─────────────────────────────────────────────────────────────────

/// Distinct tokens of `text` in first-seen order.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    push_tokens(&mut tokens, text);
    tokens
}

fn tokenize_all<'a>(texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut tokens = Vec::new();
    for text in texts {
        push_tokens(&mut tokens, text);
    }
    tokens
}

fn push_tokens(tokens: &mut Vec<String>, text: &str) {
    for raw in text.split(|c: char| !c.is_alphanumeric()) {
        if raw.chars().count() < MIN_TOKEN_LEN {
            continue;
        }
        let token = raw.to_lowercase();
        if STOPWORDS.contains(&token.as_str()) || tokens.contains(&token) {
            continue;
        }
        tokens.push(token);
    }
}

/// Equal, or a shared prefix of at least four characters that covers at
/// least three quarters of the shorter token.
pub fn tokens_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let shorter = a.chars().count().min(b.chars().count());
    let shared = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count();
    shared >= MIN_SHARED_PREFIX && shared * 4 >= shorter * 3
}

fn matches_any(token: &str, pool: &[String]) -> bool {
    pool.iter().any(|candidate| tokens_match(token, candidate))
}

fn fraction_matched(tokens: &[String], pool: &[String]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let hits = tokens.iter().filter(|t| matches_any(t, pool)).count();
    hits as f64 / tokens.len() as f64
}

// ─────────────────────────────────────────────────────────────────
// Profiles
// ─────────────────────────────────────────────────────────────────

/// Task tokens, computed once per request.
#[derive(Debug, Clone)]
pub struct TaskProfile {
    title: Vec<String>,
    description: Vec<String>,
    /// Tokens per keyword; keywords without tokens are dropped.
    keywords: Vec<Vec<String>>,
    domain: Vec<String>,
    context: Vec<String>,
    complexity: Option<Complexity>,
}

impl TaskProfile {
    pub fn new(task: &TaskDescription) -> Self {
        Self {
            title: tokenize(&task.title),
            description: tokenize(&task.description),
            keywords: task
                .keywords
                .iter()
                .map(|k| tokenize(k))
                .filter(|t| !t.is_empty())
                .collect(),
            domain: task.domain.as_deref().map(tokenize).unwrap_or_default(),
            context: task.context.as_deref().map(tokenize).unwrap_or_default(),
            complexity: task.complexity,
        }
    }

    fn keyword_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        for token in self.keywords.iter().flatten() {
            if !tokens.contains(token) {
                tokens.push(token.clone());
            }
        }
        tokens
    }

    fn text_tokens(&self) -> Vec<String> {
        merge(&[&self.title, &self.description])
    }

    fn all_tokens(&self) -> Vec<String> {
        merge(&[
            &self.title,
            &self.description,
            &self.keyword_tokens(),
            &self.domain,
        ])
    }
}

fn merge(groups: &[&Vec<String>]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for token in groups.iter().flat_map(|g| g.iter()) {
        if !merged.contains(token) {
            merged.push(token.clone());
        }
    }
    merged
}

struct PersonaProfile<'a> {
    persona: &'a Persona,
    /// Tags, domains and skills.
    terms: Vec<String>,
    expertise: Vec<String>,
    role: Vec<String>,
    identity: Vec<String>,
    working_style: Vec<String>,
    specialization: f64,
}

impl<'a> PersonaProfile<'a> {
    fn new(persona: &'a Persona, difficulty: Option<Difficulty>) -> Self {
        let expertise = tokenize_all(
            persona
                .expertise
                .domains
                .iter()
                .chain(&persona.expertise.skills)
                .map(String::as_str),
        );
        let terms = merge(&[
            &tokenize_all(persona.tags.iter().map(String::as_str)),
            &expertise,
        ]);
        let identity = tokenize(&persona.core.identity);
        let working_style = merge(&[
            &tokenize_all(
                persona
                    .behavior
                    .mindset
                    .iter()
                    .chain(&persona.behavior.methodology)
                    .map(String::as_str),
            ),
            &identity,
        ]);

        Self {
            persona,
            terms,
            expertise,
            role: tokenize(&persona.role),
            identity,
            working_style,
            specialization: specialization(difficulty),
        }
    }
}

fn specialization(difficulty: Option<Difficulty>) -> f64 {
    match difficulty {
        Some(Difficulty::Beginner) => 0.25,
        Some(Difficulty::Intermediate) => 0.55,
        Some(Difficulty::Advanced) => 0.85,
        None => NEUTRAL_FIT,
    }
}

fn complexity_target(complexity: Complexity) -> f64 {
    match complexity {
        Complexity::Simple => 0.1,
        Complexity::Moderate => 0.4,
        Complexity::Complex => 0.75,
        Complexity::Expert => 1.0,
    }
}

// ─────────────────────────────────────────────────────────────────
// Dimensions
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    KeywordMatch,
    RoleAlignment,
    ExpertiseMatch,
    ContextRelevance,
    ComplexityFit,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::KeywordMatch,
        Dimension::RoleAlignment,
        Dimension::ExpertiseMatch,
        Dimension::ContextRelevance,
        Dimension::ComplexityFit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::KeywordMatch => "keyword match",
            Dimension::RoleAlignment => "role alignment",
            Dimension::ExpertiseMatch => "expertise match",
            Dimension::ContextRelevance => "context relevance",
            Dimension::ComplexityFit => "complexity fit",
        }
    }

    fn limitation(&self) -> &'static str {
        match self {
            Dimension::KeywordMatch => "Few task terms appear in this persona's tags or skills",
            Dimension::RoleAlignment => "Role is not directly aligned with the task",
            Dimension::ExpertiseMatch => "Limited expertise in the task's domain",
            Dimension::ContextRelevance => "Working style does not reflect the task context",
            Dimension::ComplexityFit => "Specialization level does not suit the task complexity",
        }
    }

    fn weight(&self, weights: &ScoringWeights) -> f64 {
        match self {
            Dimension::KeywordMatch => weights.keyword_match,
            Dimension::RoleAlignment => weights.role_alignment,
            Dimension::ExpertiseMatch => weights.expertise_match,
            Dimension::ContextRelevance => weights.context_relevance,
            Dimension::ComplexityFit => weights.complexity_fit,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Per-dimension sub-scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScores {
    pub keyword_match: f64,
    pub role_alignment: f64,
    pub expertise_match: f64,
    pub context_relevance: f64,
    pub complexity_fit: f64,
}

impl DimensionScores {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::KeywordMatch => self.keyword_match,
            Dimension::RoleAlignment => self.role_alignment,
            Dimension::ExpertiseMatch => self.expertise_match,
            Dimension::ContextRelevance => self.context_relevance,
            Dimension::ComplexityFit => self.complexity_fit,
        }
    }

    fn is_finite(&self) -> bool {
        Dimension::ALL.iter().all(|d| self.get(*d).is_finite())
    }
}

/// Full scoring result for one persona.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub dimensions: DimensionScores,
    pub score: f64,
    pub confidence: f64,
    /// Persona tags/skills/domains that matched task terms.
    pub matched_terms: Vec<String>,
}

impl ScoreBreakdown {
    pub fn is_finite(&self) -> bool {
        self.score.is_finite() && self.confidence.is_finite() && self.dimensions.is_finite()
    }
}

/// Score one persona. `weights` must already be validated.
pub fn score_persona(
    persona: &Persona,
    difficulty: Option<Difficulty>,
    task: &TaskProfile,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let profile = PersonaProfile::new(persona, difficulty);

    let dimensions = DimensionScores {
        keyword_match: keyword_match(task, &profile),
        role_alignment: role_alignment(task, &profile),
        expertise_match: expertise_match(task, &profile),
        context_relevance: context_relevance(task, &profile),
        complexity_fit: complexity_fit(task, &profile),
    };

    let total_weight = weights.total();
    let score = if total_weight > 0.0 {
        let weighted: f64 = Dimension::ALL
            .iter()
            .map(|d| d.weight(weights) * dimensions.get(*d))
            .sum();
        (weighted / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let signals = Dimension::ALL
        .iter()
        .filter(|d| match d {
            Dimension::ComplexityFit => task.complexity.is_some() && dimensions.complexity_fit > 0.0,
            _ => dimensions.get(**d) > 0.0,
        })
        .count();

    ScoreBreakdown {
        dimensions,
        score,
        confidence: signals as f64 / Dimension::ALL.len() as f64,
        matched_terms: matched_terms(task, &profile),
    }
}

fn keyword_match(task: &TaskProfile, persona: &PersonaProfile<'_>) -> f64 {
    let text_hits = task
        .text_tokens()
        .iter()
        .filter(|t| matches_any(t, &persona.terms))
        .count();
    let text_coverage = (text_hits as f64 / TEXT_COVERAGE_SATURATION).min(1.0);

    if task.keywords.is_empty() {
        return text_coverage;
    }
    let keyword_hits = task
        .keywords
        .iter()
        .filter(|tokens| tokens.iter().any(|t| matches_any(t, &persona.terms)))
        .count();
    let keyword_coverage = keyword_hits as f64 / task.keywords.len() as f64;

    0.6 * keyword_coverage + 0.4 * text_coverage
}

fn role_alignment(task: &TaskProfile, persona: &PersonaProfile<'_>) -> f64 {
    let role_hit = task
        .all_tokens()
        .iter()
        .any(|t| matches_any(t, &persona.role));
    let identity = fraction_matched(&merge(&[&task.domain, &task.title]), &persona.identity);

    let base = if role_hit { 0.6 } else { 0.0 };
    (base + 0.4 * identity).min(1.0)
}

fn expertise_match(task: &TaskProfile, persona: &PersonaProfile<'_>) -> f64 {
    let wanted = merge(&[&task.domain, &task.keyword_tokens()]);
    fraction_matched(&wanted, &persona.expertise)
}

fn context_relevance(task: &TaskProfile, persona: &PersonaProfile<'_>) -> f64 {
    let context = if task.context.is_empty() {
        &task.description
    } else {
        &task.context
    };
    (2.0 * fraction_matched(context, &persona.working_style)).min(1.0)
}

fn complexity_fit(task: &TaskProfile, persona: &PersonaProfile<'_>) -> f64 {
    match task.complexity {
        Some(complexity) => 1.0 - (persona.specialization - complexity_target(complexity)).abs(),
        None => NEUTRAL_FIT,
    }
}

fn matched_terms(task: &TaskProfile, persona: &PersonaProfile<'_>) -> Vec<String> {
    let task_tokens = task.all_tokens();
    let p = persona.persona;
    let mut matched: Vec<String> = Vec::new();

    for term in p
        .tags
        .iter()
        .chain(&p.expertise.skills)
        .chain(&p.expertise.domains)
    {
        if matched.len() >= MAX_STRENGTHS {
            break;
        }
        let hit = tokenize(term).iter().any(|t| matches_any(t, &task_tokens));
        if hit && !matched.iter().any(|m| m.eq_ignore_ascii_case(term)) {
            matched.push(term.clone());
        }
    }
    matched
}

// ─────────────────────────────────────────────────────────────────
// Recommendation assembly
// ─────────────────────────────────────────────────────────────────

/// Turn a breakdown into the public recommendation record.
pub fn build_recommendation(
    persona: &Persona,
    breakdown: &ScoreBreakdown,
    weights: &ScoringWeights,
    include_reasoning: bool,
) -> PersonaRecommendation {
    let reasoning = if include_reasoning {
        reasoning(breakdown, weights)
    } else {
        String::new()
    };

    let strengths = if breakdown.matched_terms.is_empty() {
        vec![persona.core.primary_objective.clone()]
    } else {
        breakdown.matched_terms.clone()
    };

    let limitations: Vec<String> = Dimension::ALL
        .iter()
        .filter(|d| breakdown.dimensions.get(**d) < LIMITATION_THRESHOLD)
        .map(|d| d.limitation().to_string())
        .collect();

    PersonaRecommendation {
        persona_id: persona.id.clone(),
        score: breakdown.score,
        reasoning,
        strengths,
        limitations: if limitations.is_empty() {
            None
        } else {
            Some(limitations)
        },
        confidence: breakdown.confidence,
    }
}

fn reasoning(breakdown: &ScoreBreakdown, weights: &ScoringWeights) -> String {
    let mut ranked: Vec<(Dimension, f64)> = Dimension::ALL
        .iter()
        .map(|d| (*d, d.weight(weights) * breakdown.dimensions.get(*d)))
        .filter(|(_, contribution)| *contribution > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let percent = |d: Dimension| (breakdown.dimensions.get(d) * 100.0).round();
    let overall = (breakdown.score * 100.0).round();

    match ranked.as_slice() {
        [] => format!("No strong signals for this task; overall fit {}%", overall),
        [(only, _)] => format!(
            "Driven by {} ({}%); overall fit {}%",
            only,
            percent(*only),
            overall
        ),
        [(first, _), (second, _), ..] => format!(
            "Driven by {} ({}%) and {} ({}%); overall fit {}%",
            first,
            percent(*first),
            second,
            percent(*second),
            overall
        ),
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
