// src/error.rs
// =============================================================================
// Error types for the link-vigil library.
//
// Every operation on the engine, registry, cache and revalidator returns
// `Result<T, Error>`. Probe failures are NOT in here: a URL that cannot be
// reached is data (`LinkStatus::NotAvailable`), not an error.
//
// The binary (main.rs) wraps these in anyhow::Error with extra context.
// =============================================================================

use std::time::Duration;

use thiserror::Error;

use crate::registry::BatchId;

/// Convenience alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong in a verify/report call or at construction
#[derive(Error, Debug)]
pub enum Error {
    /// No URLs (verify) or no batch IDs (report) were supplied
    #[error("EmptyInput: no links supplied")]
    EmptyInput,

    /// A report referenced a batch that was never created
    #[error("BatchNotFound: {0}")]
    BatchNotFound(BatchId),

    /// The probe pass did not finish before the call deadline
    #[error("Timeout: probes did not complete within {0:?}")]
    Timeout(Duration),

    /// The report renderer failed
    #[error("RenderError: {0}")]
    Render(#[from] RenderError),

    /// Invalid configuration (e.g. zero cache capacity)
    #[error("ConfigurationError: {0}")]
    Configuration(String),

    /// The request payload could not be decoded
    #[error("DecodingError: {0}")]
    Decoding(String),

    /// The revalidator did not accept the stop signal in time
    #[error("ShutdownTimeout: stop signal not delivered within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Errors raised by a report renderer
#[derive(Error, Debug)]
pub enum RenderError {
    /// JSON encoding failed
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the rendered output failed
    #[error("formatting failed: {0}")]
    Format(#[from] std::fmt::Error),

    /// Building or serializing the PDF document failed
    #[error("pdf generation failed: {0}")]
    Pdf(String),
}
