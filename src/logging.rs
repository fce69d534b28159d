//! Tracing subscriber setup.
//!
//! Console output always goes to stderr because stdout carries the JSON
//! results of one-shot commands. A rolling file layer can sit alongside it.
//! `RUST_LOG`, when set, replaces the default filter entirely.

use std::fs;
use std::io::IsTerminal;
use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::{LogRotation, LoggingSettings};
use crate::error::{Error, Result};

/// Target prefix of this crate's events.
const CRATE_TARGET: &str = "personas_server";

/// The watch backend and its poller log every inotify event at debug.
const QUIET_TARGETS: &[&str] = &["notify", "mio"];

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Keeps the file writer flushing until dropped.
pub struct LogGuards {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber for the binary.
pub fn init_logging(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Result<LogGuards> {
    let level = effective_level(settings, verbose, quiet);
    let filter = build_env_filter(level, std::env::var("RUST_LOG").ok().as_deref())?;
    let console = console_layer(
        settings.json_format,
        std::io::stderr().is_terminal(),
        std::io::stderr,
    );

    let (file, file_guard) = match settings.file.as_deref() {
        Some(path) => {
            let (layer, guard) = file_layer(Path::new(path), settings)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(
        level = %level,
        file = ?settings.file,
        rotation = ?settings.rotation,
        json = settings.json_format,
        "Logging initialized"
    );

    Ok(LogGuards {
        _file_guard: file_guard,
    })
}

/// Console-only logging at a fixed level, for the `config` commands.
pub fn init_simple(level: Level) -> Result<()> {
    let filter = build_env_filter(level, std::env::var("RUST_LOG").ok().as_deref())?;
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer(false, std::io::stderr().is_terminal(), std::io::stderr))
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))
}

/// `-q` wins over `-v`; otherwise each `-v` steps below the configured level.
fn effective_level(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => settings.level.parse().unwrap_or(Level::INFO),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Directives layered over the base level when `RUST_LOG` is unset.
fn filter_directives(level: Level) -> Vec<String> {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = vec![format!("{}={}", CRATE_TARGET, level)];
    directives.extend(QUIET_TARGETS.iter().map(|target| format!("{}=warn", target)));
    directives
}

fn build_env_filter(level: Level, rust_log: Option<&str>) -> Result<EnvFilter> {
    if let Some(spec) = rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        return EnvFilter::try_new(spec)
            .map_err(|e| Error::config_field_invalid("RUST_LOG", format!("Invalid filter '{}': {}", spec, e)));
    }

    let mut filter = EnvFilter::new(level.as_str().to_ascii_lowercase());
    for directive in filter_directives(level) {
        let parsed = directive.parse::<Directive>().map_err(|e| {
            Error::Internal(format!("Invalid built-in filter directive '{}': {}", directive, e))
        })?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

fn console_layer<S, W>(json: bool, ansi: bool, writer: W) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        Box::new(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_current_span(false),
        )
    } else {
        Box::new(
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(ansi)
                .compact(),
        )
    }
}

fn rotation(setting: LogRotation) -> Rotation {
    match setting {
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Non-blocking rolling file layer. `server.log` becomes prefix `server`
/// and suffix `log`; the appender inserts the date between them.
fn file_layer<S>(path: &Path, settings: &LoggingSettings) -> Result<(BoxedLayer<S>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(directory).map_err(|e| Error::IoWrite {
        path: directory.to_path_buf(),
        source: e,
    })?;

    let prefix = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("server");
    let suffix = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("log");

    let appender = RollingFileAppender::builder()
        .rotation(rotation(settings.rotation))
        .filename_prefix(prefix)
        .filename_suffix(suffix)
        .max_log_files(settings.max_files.max(1) as usize)
        .build(directory)
        .map_err(|e| {
            Error::config_field_invalid("logging.file", format!("Cannot open log file: {}", e))
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer: BoxedLayer<S> = if settings.json_format {
        Box::new(fmt::layer().json().with_writer(writer).with_ansi(false))
    } else {
        Box::new(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true),
        )
    };
    Ok((layer, guard))
}
