//! Personas Server
//!
//! Entry point for the `personas-server` binary. Commands load the persona
//! registry, run the recommendation engine and print results as JSON.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use personas_server::cli::{self, Cli, Commands, ConfigSubcommand};
use personas_server::config::{self, ServerConfig};
use personas_server::error::{Error, Result};
use personas_server::logging;
use personas_server::persona::{loader, PersonaProvider, PersonaRegistry};
use personas_server::recommend::{RecommendationEngine, RecommendationRequest};

fn main() {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    // Config commands use minimal logging
    if let Commands::Config { subcommand } = &cli.command {
        logging::init_simple(tracing::Level::WARN)?;
        return handle_config_command(subcommand.clone(), cli.config.as_deref());
    }

    let config = ServerConfig::load(cli.config.as_deref())?;

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;
    debug!(version = env!("CARGO_PKG_VERSION"), "Starting personas server");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    let result = runtime.block_on(dispatch(cli.command, config));
    if let Err(e) = &result {
        log_failure(e);
    }
    result
}

/// Record a command failure in the log before it is printed to the terminal.
fn log_failure(e: &Error) {
    if e.is_fatal() {
        error!("{}", e.format_for_log());
    } else if e.is_recoverable() {
        debug!("{}", e.format_for_log());
    } else {
        warn!("{}", e.format_for_log());
    }
}

async fn dispatch(command: Commands, config: ServerConfig) -> Result<()> {
    if let Commands::Serve = command {
        return serve(config).await;
    }

    // One-shot commands never watch
    let mut options = config.registry.to_options();
    options.watch = false;
    let registry = PersonaRegistry::load(options).await;

    match command {
        Commands::List => {
            let personas: Vec<_> = registry
                .get_all_personas()
                .iter()
                .map(|p| {
                    json!({
                        "id": p.id(),
                        "name": p.name(),
                        "role": p.role(),
                        "tier": p.tier(),
                        "filePath": p.source().file_path,
                    })
                })
                .collect();
            print_json(&personas)
        }
        Commands::Show { id } => {
            let persona = registry
                .get_persona(&id)
                .ok_or_else(|| Error::persona_not_found(&id))?;
            print_json(persona.as_ref())
        }
        Commands::Info => print_json(&registry.get_persona_info()),
        Commands::Recommend {
            task,
            max,
            no_reasoning,
            time_constraint,
            priority,
            phase,
        } => {
            let engine = build_engine(&registry, &config)?;
            let task = task.into_task();
            let max = max.unwrap_or(config.scoring.max_recommendations);

            let response =
                match cli::recommendation_context(
                    time_constraint,
                    priority,
                    phase,
                    Some(max),
                    !no_reasoning,
                ) {
                    Some(context) => engine.get_contextual_recommendations(&task, &context)?,
                    None => {
                        let request = RecommendationRequest::new(task)
                            .with_max_recommendations(max)
                            .with_reasoning(!no_reasoning);
                        engine.process_recommendation(&request)?
                    }
                };
            print_json(&response)
        }
        Commands::Explain { id, task } => {
            let engine = build_engine(&registry, &config)?;
            let task = task.into_task();
            task.validate()?;
            let explanation = engine
                .explain_persona_fit(&id, &task)
                .ok_or_else(|| Error::persona_not_found(&id))?;
            print_json(&explanation)
        }
        Commands::Compare { ids, task } => {
            let engine = build_engine(&registry, &config)?;
            let task = task.into_task();
            task.validate()?;
            print_json(&engine.compare_personas(&ids, &task))
        }
        Commands::Stats => {
            let engine = build_engine(&registry, &config)?;
            print_json(&engine.get_system_stats())
        }
        Commands::Validate { file } => validate_document(&file).await,
        Commands::Serve | Commands::Config { .. } => {
            Err(Error::Internal("command already handled".to_string()))
        }
    }
}

fn build_engine(registry: &Arc<PersonaRegistry>, config: &ServerConfig) -> Result<RecommendationEngine> {
    let provider: Arc<dyn PersonaProvider> = registry.clone();
    RecommendationEngine::with_weights(provider, config.scoring.weights()?)
}

/// Run until Ctrl-C, logging each registry rebuild
async fn serve(config: ServerConfig) -> Result<()> {
    info!(
        user_dir = %config.registry.user_dir,
        project_dir = %config.registry.project_dir,
        watch = config.registry.watch,
        debounce_ms = config.registry.debounce_ms,
        "Persona sources configured"
    );

    let registry = PersonaRegistry::load(config.registry.to_options()).await;
    let engine = build_engine(&registry, &config)?;
    let stats = engine.get_system_stats();
    info!(
        personas = stats.total_personas,
        roles = ?stats.available_roles,
        watching = registry.is_watching(),
        "Personas server ready"
    );

    let mut reloads = registry.subscribe();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for shutdown signal");
                }
                info!("Shutdown signal received");
                break;
            }
            event = reloads.recv() => match event {
                Ok(event) => debug!(
                    generation = event.generation,
                    personas = engine.get_system_stats().total_personas,
                    "Engine now serving reloaded registry"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Reload notifications lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    registry.shutdown().await;
    info!("Personas server stopped");
    Ok(())
}

async fn validate_document(path: &Path) -> Result<()> {
    let loaded = loader::validate_file(path).await;
    if loaded.is_valid() {
        println!("✓ {} is valid (id: {})", path.display(), loaded.id());
        return Ok(());
    }
    Err(Error::SchemaValidation {
        path: path.to_path_buf(),
        errors: loaded.validation_errors().to_vec(),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_config_command(subcommand: ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = ServerConfig::load(config_path)?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration file created: {}", written.display());
        }
        ConfigSubcommand::Validate => {
            ServerConfig::load(config_path)?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
