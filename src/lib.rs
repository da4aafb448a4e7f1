//! # Resonance - Streaming Stereo Audio Analysis
//!
//! Turns per-block stereo audio into loudness, phase, dynamics and spectral
//! metrics, plus time-series analyses of how energy moves between bands.
//!
//! ## Architecture
//!
//! Resonance is an umbrella crate that coordinates:
//! - **resonance-analysis** - The analysis stages (band mapping, block metrics,
//!   gated loudness, band tracking, trends, band relationships, phase coherence,
//!   emotional profile and genre estimate)
//! - **AnalysisEngine** - Owned pipeline running every stage per block
//! - **LiveAnalyzer** - The engine on its own thread, fed latest-wins and
//!   publishing `Arc<Metrics>` snapshots to subscribers
//!
//! Audio capture and FFT magnitude computation happen upstream; each
//! [`AudioBlock`](analysis::AudioBlock) carries both.
//!
//! ## Quick Start
//!
//! ```rust
//! use resonance::prelude::*;
//!
//! let mut engine = AnalysisEngine::builder()
//!     .band_count(32)
//!     .frequency_range(20.0, 20000.0)
//!     .build()?;
//!
//! let time: Vec<f32> = (0..4096)
//!     .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48000.0).sin())
//!     .collect();
//! let block = AudioBlock {
//!     time_left: time.clone(),
//!     time_right: time,
//!     freq_left: vec![-40.0; 2048],
//!     freq_right: vec![-40.0; 2048],
//!     sample_rate: 48000.0,
//!     fft_size: 4096,
//!     timestamp: 0.0,
//! };
//!
//! let metrics = engine.process(&block)?;
//! assert!(metrics.correlation > 0.99);
//! assert!(metrics.loudness.momentary > -70.0);
//! # Ok::<(), resonance::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `serialization` - serde derives on configuration and output types

/// Re-export of resonance-analysis for direct access
pub use resonance_analysis as analysis;

pub use resonance_analysis::{
    AnalysisWarning, AudioBlock, BandConfig, Classification, Emotion, EmotionalProfile,
    FrequencyBand, Genre, HistoryKind, LoudnessReading, RelationshipType, Spacing,
    WindowFunction,
};

mod builder;
mod config;
mod engine;
mod error;
mod handle;
mod history;
mod live;
mod metrics;

pub use builder::AnalyzerBuilder;
pub use config::{AnalyzerConfig, HistoryConfig, LiveConfig};
pub use engine::AnalysisEngine;
pub use error::{Error, Result};
pub use handle::AnalysisHandle;
pub use history::{MetricHistory, Spectrogram, SpectrogramFrame};
pub use live::{LiveAnalyzer, SubmitOutcome};
pub use metrics::Metrics;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        AnalysisEngine, AnalysisHandle, AnalyzerBuilder, AnalyzerConfig, LiveAnalyzer, Metrics,
        SubmitOutcome,
    };

    pub use crate::analysis::{
        AnalysisWarning, AudioBlock, Classification, Emotion, Genre, RelationshipType, Spacing,
        WindowFunction,
    };
}
