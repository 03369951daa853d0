// src/checker/mod.rs
// =============================================================================
// This module contains the link checking logic.
//
// Submodules:
// - probe: the LinkStatus type, the Prober trait and the HTTP prober
//
// This file (mod.rs) is the module root - it re-exports the public API so the
// rest of the crate can write `checker::Prober` instead of
// `checker::probe::Prober`.
// =============================================================================

mod probe;

pub use probe::{probe_target, HttpProber, LinkStatus, Prober};
