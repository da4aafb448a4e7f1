//! Integration test modules for Resonance
//!
//! - engine: per-block metrics, silence, reset, reconfiguration
//! - loudness: gated loudness and display smoothing
//! - bands: energies, trends, relationships, phase coherence
//! - live: analysis thread behavior

pub mod bands;
pub mod engine;
pub mod live;
pub mod loudness;
