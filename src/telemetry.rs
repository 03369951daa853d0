// src/telemetry.rs
// =============================================================================
// Logging setup.
//
// Everything in the crate logs through `tracing` macros. This installs the
// global subscriber once, at startup:
// - level from RUST_LOG if set, otherwise from the [log] section
// - human-readable text or one JSON object per line
// - logs go to stderr so `check --json` output on stdout stays parseable,
//   or are appended to `log.path` when one is configured
// =============================================================================

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, EnvFilter};

use crate::config::{LogConfig, LogFormat};
use crate::error::{Error, Result};

/// Picks where log lines go. Fails only if the log file cannot be opened.
fn make_writer(config: &LogConfig) -> Result<BoxMakeWriter> {
    match &config.path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::Configuration(format!("cannot open log file {}: {}", path.display(), e))
                })?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
        None => Ok(BoxMakeWriter::new(std::io::stderr)),
    }
}

/// Installs the global tracing subscriber. Calling it twice is harmless.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let writer = make_writer(config)?;
    // No colour codes in files
    let ansi = config.path.is_none();

    let registry = tracing_subscriber::registry().with(env_filter);

    // Ignore the error if a subscriber is already set
    let _ = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_writer(writer)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_ansi(ansi).with_writer(writer)),
        ),
    };

    Ok(())
}
