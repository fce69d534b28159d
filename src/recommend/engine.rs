//! Recommendation engine: ranks personas of the active snapshot against a
//! task.
//!
//! Weights are owned by the engine and copied once at the start of every
//! request, so a concurrent update never mixes two weight sets inside one
//! ranking.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::Result;
use crate::persona::{LoadedPersona, PersonaProvider};

use super::scoring::{build_recommendation, score_persona, DimensionScores, TaskProfile};
use super::types::{
    Complexity, PersonaFitExplanation, PersonaRecommendation, RecommendationContext,
    RecommendationRequest, RecommendationResponse, ScoringWeights, SystemInfo, SystemStats,
    TaskDescription, TimeConstraint, DEFAULT_MAX_RECOMMENDATIONS,
};

/// Capabilities reported by [`RecommendationEngine::get_system_stats`].
const FEATURES: &[&str] = &[
    "multi-tier-resolution",
    "live-reload",
    "weighted-scoring",
    "persona-comparison",
    "contextual-recommendations",
];

pub struct RecommendationEngine {
    provider: Arc<dyn PersonaProvider>,
    weights: RwLock<ScoringWeights>,
}

impl RecommendationEngine {
    /// Engine with the default weights.
    pub fn new(provider: Arc<dyn PersonaProvider>) -> Self {
        Self {
            provider,
            weights: RwLock::new(ScoringWeights::default()),
        }
    }

    pub fn with_weights(provider: Arc<dyn PersonaProvider>, weights: ScoringWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self {
            provider,
            weights: RwLock::new(weights),
        })
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        *self.weights.read()
    }

    /// Replace the weight set. Affects requests that start afterwards.
    pub fn update_scoring_weights(&self, weights: ScoringWeights) -> Result<()> {
        weights.validate()?;
        *self.weights.write() = weights;
        info!(weights = ?weights, "Scoring weights updated");
        Ok(())
    }

    /// Score every valid persona and return the best matches.
    pub fn process_recommendation(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse> {
        request.validate()?;
        let started = Instant::now();
        let weights = self.scoring_weights();
        let snapshot = self.provider.snapshot();
        let profile = TaskProfile::new(&request.task);

        let mut recommendations: Vec<PersonaRecommendation> = snapshot
            .personas()
            .iter()
            .filter_map(|record| {
                evaluate(record, &profile, &weights, request.include_reasoning).map(|(r, _)| r)
            })
            .collect();

        // Stable: ties keep registry order.
        recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));
        recommendations.truncate(request.max_recommendations as usize);

        let response = RecommendationResponse {
            recommendations,
            total_personas_evaluated: snapshot.len(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        };

        debug!(
            title = %request.task.title,
            evaluated = response.total_personas_evaluated,
            returned = response.recommendations.len(),
            top = response.recommendations.first().map(|r| r.persona_id.as_str()).unwrap_or("-"),
            elapsed_ms = response.processing_time_ms,
            "Recommendation processed"
        );
        Ok(response)
    }

    /// Full scored record for one persona, or `None` if the id is not a
    /// valid persona of the current snapshot.
    pub fn explain_persona_fit(
        &self,
        persona_id: &str,
        task: &TaskDescription,
    ) -> Option<PersonaFitExplanation> {
        let weights = self.scoring_weights();
        let snapshot = self.provider.snapshot();
        let record = snapshot.get(persona_id)?;
        let persona = record.persona()?.clone();

        let (recommendation, dimensions) =
            evaluate(record, &TaskProfile::new(task), &weights, true)?;
        Some(PersonaFitExplanation {
            persona,
            recommendation,
            dimensions,
        })
    }

    /// Score the requested personas only, best first. Unknown ids are
    /// dropped and duplicates are scored once.
    pub fn compare_personas(
        &self,
        persona_ids: &[String],
        task: &TaskDescription,
    ) -> Vec<PersonaRecommendation> {
        if persona_ids.is_empty() {
            return Vec::new();
        }
        let weights = self.scoring_weights();
        let snapshot = self.provider.snapshot();
        let profile = TaskProfile::new(task);

        let mut seen: Vec<&str> = Vec::new();
        let mut results = Vec::new();
        for id in persona_ids {
            if seen.contains(&id.as_str()) {
                continue;
            }
            seen.push(id);
            match snapshot.get(id) {
                Some(record) => {
                    if let Some((rec, _)) = evaluate(record, &profile, &weights, true) {
                        results.push(rec);
                    }
                }
                None => debug!(id = %id, "Unknown persona skipped in comparison"),
            }
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }

    /// Recommend after adjusting a copy of `task` for the situation.
    pub fn get_contextual_recommendations(
        &self,
        task: &TaskDescription,
        context: &RecommendationContext,
    ) -> Result<RecommendationResponse> {
        let adjusted = adjust_for_context(task, context);
        if adjusted.complexity != task.complexity {
            debug!(
                from = ?task.complexity,
                to = ?adjusted.complexity,
                "Complexity adjusted for context"
            );
        }
        let request = RecommendationRequest::new(adjusted)
            .with_max_recommendations(
                context
                    .max_recommendations
                    .unwrap_or(DEFAULT_MAX_RECOMMENDATIONS),
            )
            .with_reasoning(context.include_reasoning);
        self.process_recommendation(&request)
    }

    pub fn get_system_stats(&self) -> SystemStats {
        let snapshot = self.provider.snapshot();
        SystemStats {
            total_personas: snapshot.len(),
            available_roles: snapshot.available_roles(),
            scoring_weights: self.scoring_weights(),
            system_info: SystemInfo {
                version: env!("CARGO_PKG_VERSION").to_string(),
                features: FEATURES.iter().map(|f| f.to_string()).collect(),
            },
        }
    }
}

fn evaluate(
    record: &LoadedPersona,
    profile: &TaskProfile,
    weights: &ScoringWeights,
    include_reasoning: bool,
) -> Option<(PersonaRecommendation, DimensionScores)> {
    let document = record.document()?;
    let breakdown = score_persona(&document.persona, document.difficulty(), profile, weights);
    if !breakdown.is_finite() {
        debug!(id = %record.id(), "Skipping persona with non-finite score");
        return None;
    }
    let recommendation =
        build_recommendation(&document.persona, &breakdown, weights, include_reasoning);
    Some((recommendation, breakdown.dimensions))
}

/// Tight deadlines pull complexity down; pressing priority pushes it up.
fn adjust_for_context(task: &TaskDescription, context: &RecommendationContext) -> TaskDescription {
    let mut adjusted = task.clone();

    if context.time_constraint == Some(TimeConstraint::Tight) {
        adjusted.complexity = Some(
            adjusted
                .complexity
                .map(Complexity::lower)
                .unwrap_or(Complexity::Simple),
        );
    }

    let pressing = context
        .priority
        .or(task.urgency)
        .map(|u| u.is_pressing())
        .unwrap_or(false);
    if pressing {
        adjusted.complexity = Some(
            adjusted
                .complexity
                .map(Complexity::raise)
                .unwrap_or(Complexity::Complex),
        );
    }

    if let Some(phase) = context.project_phase.as_deref().filter(|p| !p.trim().is_empty()) {
        adjusted.context = Some(match adjusted.context.take() {
            Some(existing) => format!("{} {}", existing, phase),
            None => phase.to_string(),
        });
    }

    adjusted
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
