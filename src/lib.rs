//! Personas Server
//!
//! Resolves persona documents from three precedence tiers (built-in, user,
//! project) into an atomically swapped registry snapshot with debounced live
//! reload, and ranks personas against task descriptions with a weighted
//! multi-factor scoring engine.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod persona;
pub mod recommend;

pub use error::{Error, ErrorCode, Result};
pub use persona::{PersonaRegistry, RegistryOptions, RegistrySnapshot};
pub use recommend::RecommendationEngine;
