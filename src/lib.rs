// src/lib.rs
// =============================================================================
// link-vigil: a link-liveness cache and concurrent verification engine.
//
// Modules, leaf first:
// - cache:      bounded URL -> status store with LRU eviction
// - registry:   append-only, sequentially numbered URL batches
// - checker:    the Prober trait and the HTTP prober
// - engine:     verify / report with concurrent probe fan-out
// - revalidate: background loop that keeps cached statuses fresh
// - report:     renderers for report output
// - server:     axum HTTP front end
// - config, telemetry, error: configuration, logging, error types
// =============================================================================

pub mod cache;
pub mod checker;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod report;
pub mod revalidate;
pub mod server;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::LivenessCache;
pub use checker::{HttpProber, LinkStatus, Prober};
pub use config::Config;
pub use engine::{EngineConfig, Verification, VerificationEngine};
pub use error::{Error, RenderError, Result};
pub use registry::{BatchId, BatchRegistry};
pub use report::{JsonRenderer, PdfRenderer, ReportFormat, Renderer, TextRenderer};
pub use revalidate::{Revalidator, RevalidatorConfig, RevalidatorState};
