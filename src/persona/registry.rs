//! Persona registry: merges default, user and project personas into an
//! immutable snapshot and swaps in a new one on every rebuild.
//!
//! Precedence is `project > user > default`. Invalid documents are counted
//! and reported but never take part in precedence: an invalid project file
//! does not hide a valid default persona with the same name.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::defaults;
use super::discovery::discover_persona_files;
use super::loader::load_persona_file;
use super::types::{LoadedPersona, SourceTier};
use super::watcher::{self, WatchHandle};

/// Default debounce window for filesystem change bursts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default capacity of the watcher → rebuild queue.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

const RELOAD_EVENT_CAPACITY: usize = 16;

// ─────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────

/// Registry construction options.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// User override directory (`None` disables the tier).
    pub user_dir: Option<PathBuf>,

    /// Project override directory (`None` disables the tier).
    pub project_dir: Option<PathBuf>,

    /// Watch the override directories and rebuild on change.
    pub watch: bool,

    /// Quiet period required after the last change before rebuilding.
    pub debounce: Duration,

    /// Bounded queue size between the watcher and the rebuild task.
    pub event_capacity: usize,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            user_dir: None,
            project_dir: None,
            watch: false,
            debounce: DEFAULT_DEBOUNCE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl RegistryOptions {
    /// Override directories that are configured, in merge order.
    pub fn override_dirs(&self) -> Vec<(SourceTier, PathBuf)> {
        let mut dirs = Vec::new();
        if let Some(dir) = &self.user_dir {
            dirs.push((SourceTier::User, dir.clone()));
        }
        if let Some(dir) = &self.project_dir {
            dirs.push((SourceTier::Project, dir.clone()));
        }
        dirs
    }
}

// ─────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStatistics {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

/// An id declared by more than one valid document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonaConflict {
    pub id: String,
    /// Declaring tiers in merge order.
    pub tiers: Vec<SourceTier>,
    pub winner: SourceTier,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidPersonaInfo {
    pub id: String,
    pub tier: SourceTier,
    pub file_path: Option<PathBuf>,
    pub errors: Vec<String>,
}

/// Observability view of a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PersonaInfo {
    pub statistics: RegistryStatistics,
    pub conflicts: Vec<PersonaConflict>,
    pub invalid: Vec<InvalidPersonaInfo>,
}

/// Immutable, fully resolved view of the persona set.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    personas: Vec<Arc<LoadedPersona>>,
    index: HashMap<String, usize>,
    conflicts: Vec<PersonaConflict>,
    invalid: Vec<Arc<LoadedPersona>>,
    statistics: RegistryStatistics,
    generation: u64,
    built_at: DateTime<Utc>,
}

impl RegistrySnapshot {
    pub fn empty() -> Self {
        Self::build(Vec::new(), 0)
    }

    /// Resolve records given in merge order (lowest precedence first).
    ///
    /// A winner keeps the position of the first valid declaration of its id.
    pub fn build(records: Vec<LoadedPersona>, generation: u64) -> Self {
        let mut personas: Vec<Arc<LoadedPersona>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut declarations: Vec<(String, Vec<SourceTier>)> = Vec::new();
        let mut invalid = Vec::new();

        for record in records {
            if !record.is_valid() {
                invalid.push(Arc::new(record));
                continue;
            }

            let id = record.id().to_string();
            let tier = record.tier();
            match index.get(&id) {
                Some(&pos) => {
                    declarations[pos].1.push(tier);
                    personas[pos] = Arc::new(record);
                }
                None => {
                    index.insert(id.clone(), personas.len());
                    declarations.push((id, vec![tier]));
                    personas.push(Arc::new(record));
                }
            }
        }

        let conflicts = declarations
            .into_iter()
            .enumerate()
            .filter(|(_, (_, tiers))| tiers.len() > 1)
            .map(|(pos, (id, tiers))| PersonaConflict {
                id,
                tiers,
                winner: personas[pos].tier(),
            })
            .collect();

        let statistics = RegistryStatistics {
            total: personas.len() + invalid.len(),
            valid: personas.len(),
            invalid: invalid.len(),
        };

        Self {
            personas,
            index,
            conflicts,
            invalid,
            statistics,
            generation,
            built_at: Utc::now(),
        }
    }

    /// Winning (valid) personas in stable registry order.
    pub fn personas(&self) -> &[Arc<LoadedPersona>] {
        &self.personas
    }

    pub fn get(&self, id: &str) -> Option<&Arc<LoadedPersona>> {
        self.index.get(id).map(|&pos| &self.personas[pos])
    }

    pub fn conflicts(&self) -> &[PersonaConflict] {
        &self.conflicts
    }

    /// Every invalid document from every tier.
    pub fn invalid(&self) -> &[Arc<LoadedPersona>] {
        &self.invalid
    }

    pub fn statistics(&self) -> RegistryStatistics {
        self.statistics
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Distinct roles of the winning personas, first-seen order.
    pub fn available_roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = Vec::new();
        for persona in &self.personas {
            let role = persona.role();
            if !roles.iter().any(|r| r == role) {
                roles.push(role.to_string());
            }
        }
        roles
    }

    pub fn info(&self) -> PersonaInfo {
        PersonaInfo {
            statistics: self.statistics,
            conflicts: self.conflicts.clone(),
            invalid: self
                .invalid
                .iter()
                .map(|record| InvalidPersonaInfo {
                    id: record.id().to_string(),
                    tier: record.tier(),
                    file_path: record.source().file_path.clone(),
                    errors: record.validation_errors().to_vec(),
                })
                .collect(),
        }
    }
}

/// Anything that can hand out a consistent persona snapshot.
pub trait PersonaProvider: Send + Sync {
    fn snapshot(&self) -> Arc<RegistrySnapshot>;
}

impl PersonaProvider for RegistrySnapshot {
    fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::new(self.clone())
    }
}

// ─────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────

/// Emitted after every rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadEvent {
    pub generation: u64,
    pub statistics: RegistryStatistics,
    pub duration_ms: u64,
}

/// Live persona registry.
pub struct PersonaRegistry {
    options: RegistryOptions,

    /// Active snapshot. The write lock is only held for the pointer swap.
    current: RwLock<Arc<RegistrySnapshot>>,

    generation: AtomicU64,
    reloads: AtomicU64,
    events: broadcast::Sender<ReloadEvent>,
    watch: Mutex<Option<WatchHandle>>,
}

impl PersonaRegistry {
    /// Create a registry holding an empty snapshot. Call
    /// [`initialize`](Self::initialize) to load personas.
    pub fn new(options: RegistryOptions) -> Arc<Self> {
        let (events, _) = broadcast::channel(RELOAD_EVENT_CAPACITY);
        Arc::new(Self {
            options,
            current: RwLock::new(Arc::new(RegistrySnapshot::empty())),
            generation: AtomicU64::new(0),
            reloads: AtomicU64::new(0),
            events,
            watch: Mutex::new(None),
        })
    }

    /// Create and initialize in one step.
    pub async fn load(options: RegistryOptions) -> Arc<Self> {
        let registry = Self::new(options);
        registry.initialize().await;
        registry
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Build the first snapshot and start watching if enabled.
    ///
    /// A watcher that cannot be started is logged; the registry stays
    /// usable without live reload.
    pub async fn initialize(self: &Arc<Self>) {
        let started = Instant::now();
        let snapshot = Arc::new(self.build_snapshot(0).await);
        let stats = snapshot.statistics();
        self.install(snapshot);

        info!(
            total = stats.total,
            valid = stats.valid,
            invalid = stats.invalid,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Persona registry initialized"
        );

        if self.options.watch {
            if let Err(e) = self.start_watching().await {
                warn!(error = %e.format_for_log(), "Live reload disabled");
            }
        }
    }

    async fn start_watching(self: &Arc<Self>) -> crate::error::Result<()> {
        let mut dirs = Vec::new();
        for (tier, dir) in self.options.override_dirs() {
            match tokio::fs::metadata(&dir).await {
                Ok(meta) if meta.is_dir() => dirs.push(dir),
                _ => debug!(tier = %tier, path = %dir.display(), "Override directory absent, not watched"),
            }
        }
        if dirs.is_empty() {
            info!("No override directories to watch");
            return Ok(());
        }

        let handle = watcher::spawn(
            &dirs,
            self.options.debounce,
            self.options.event_capacity,
            Arc::downgrade(self),
        )?;
        info!(
            dirs = dirs.len(),
            debounce_ms = self.options.debounce.as_millis() as u64,
            "Watching persona directories"
        );

        if let Some(previous) = self.watch.lock().replace(handle) {
            drop(previous);
        }
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.watch.lock().is_some()
    }

    /// Rebuild all three tiers from scratch and swap the result in.
    pub async fn reload(&self) -> Arc<RegistrySnapshot> {
        let started = Instant::now();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(self.build_snapshot(generation).await);
        let installed = self.install(snapshot.clone());
        self.reloads.fetch_add(1, Ordering::SeqCst);

        let stats = snapshot.statistics();
        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            generation,
            installed,
            total = stats.total,
            valid = stats.valid,
            invalid = stats.invalid,
            conflicts = snapshot.conflicts().len(),
            duration_ms,
            "Persona registry reloaded"
        );
        // No subscribers is fine.
        let _ = self.events.send(ReloadEvent {
            generation,
            statistics: stats,
            duration_ms,
        });

        snapshot
    }

    /// Install a snapshot unless a newer one is already active.
    fn install(&self, snapshot: Arc<RegistrySnapshot>) -> bool {
        let mut current = self.current.write();
        if snapshot.generation() >= current.generation() {
            *current = snapshot;
            true
        } else {
            debug!(
                stale = snapshot.generation(),
                active = current.generation(),
                "Discarding stale snapshot"
            );
            false
        }
    }

    async fn build_snapshot(&self, generation: u64) -> RegistrySnapshot {
        let mut records = defaults::load_defaults();

        for (tier, dir) in self.options.override_dirs() {
            let files = discover_persona_files(&dir).await;
            debug!(tier = %tier, path = %dir.display(), files = files.len(), "Loading override tier");
            for path in files {
                records.push(load_persona_file(&path, tier).await);
            }
        }

        let snapshot = RegistrySnapshot::build(records, generation);
        for conflict in snapshot.conflicts() {
            debug!(
                id = %conflict.id,
                tiers = ?conflict.tiers,
                winner = %conflict.winner,
                "Persona id declared in several places"
            );
        }
        snapshot
    }

    // ─────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────

    /// Current snapshot (consistent for as long as the caller holds it).
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.read().clone()
    }

    /// All winning personas in stable registry order.
    pub fn get_all_personas(&self) -> Vec<Arc<LoadedPersona>> {
        self.snapshot().personas().to_vec()
    }

    pub fn get_persona(&self, id: &str) -> Option<Arc<LoadedPersona>> {
        self.snapshot().get(id).cloned()
    }

    pub fn get_persona_info(&self) -> PersonaInfo {
        self.snapshot().info()
    }

    /// Rebuilds performed since construction, excluding the initial build.
    pub fn reload_count(&self) -> u64 {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.events.subscribe()
    }

    /// Stop the watcher and any pending debounce. Idempotent.
    pub async fn shutdown(&self) {
        let handle = self.watch.lock().take();
        if let Some(handle) = handle {
            handle.stop().await;
            info!("Persona watcher stopped");
        }
    }
}

impl PersonaProvider for PersonaRegistry {
    fn snapshot(&self) -> Arc<RegistrySnapshot> {
        PersonaRegistry::snapshot(self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
