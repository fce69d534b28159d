//! Persona system: role definitions resolved from three source tiers.
//!
//! Defaults are compiled in; user and project directories may override them
//! by id. The registry serves immutable snapshots and rebuilds on change.

pub mod defaults;
pub mod discovery;
pub mod loader;
pub mod registry;
pub mod schema;
pub mod types;
pub mod watcher;

pub use discovery::discover_persona_files;
pub use loader::{load_persona_file, validate_file};
pub use registry::{
    InvalidPersonaInfo, PersonaConflict, PersonaInfo, PersonaProvider, PersonaRegistry,
    RegistryOptions, RegistrySnapshot, RegistryStatistics, ReloadEvent,
};
pub use types::{
    BehaviorDiagram, CatalogMetadata, DiagramType, Difficulty, DocumentMetadata, LoadedPersona,
    Persona, PersonaBehavior, PersonaCore, PersonaDocument, PersonaExpertise, PersonaSource,
    SourceTier,
};
