//! Persona recommendation: weighted multi-factor scoring, ranking,
//! comparison and explanation.

pub mod engine;
pub mod scoring;
pub mod types;

pub use engine::RecommendationEngine;
pub use scoring::{Dimension, DimensionScores};
pub use types::{
    Complexity, PersonaFitExplanation, PersonaRecommendation, RecommendationContext,
    RecommendationRequest, RecommendationResponse, ScoringWeights, SystemInfo, SystemStats,
    TaskDescription, TimeConstraint, Urgency, DEFAULT_MAX_RECOMMENDATIONS, MAX_RECOMMENDATIONS_LIMIT,
};
