//! # Resonance Analysis
//!
//! Streaming stereo analysis building blocks.
//!
//! This crate provides:
//! - **Band mapping**: log or linear band layouts and FFT bin assignment
//! - **Block metrics**: phase correlation, stereo width, crest factor, clipping,
//!   spectral centroid, sub-bass mono ratio and band energies
//! - **Loudness**: relative-gated momentary, short-term and integrated loudness
//! - **Band tracking**: smoothed per-band energy with bounded history
//! - **Trends**: emerging/fading/stable classification and spectral shape
//! - **Relationships**: pairwise band correlation with classification
//! - **Phase coherence**: per-band cross-channel coherence from a complex FFT
//! - **Emotion**: joy, tension, energy and warmth dimensions with a genre estimate
//!
//! Every component is a plain owned value; the `resonance` crate wires them
//! into an engine and a live analysis thread.
//!
//! ## Example
//!
//! ```rust
//! use resonance_analysis::{
//!     bands::{BandConfig, BandLayout},
//!     loudness::{LoudnessConfig, LoudnessMeter},
//!     stereo::analyze_stereo,
//! };
//!
//! let layout = BandLayout::new(BandConfig::default()).unwrap();
//! assert_eq!(layout.band_index_for_frequency(10.0), None);
//!
//! let left: Vec<f32> = (0..2048).map(|i| (i as f32 * 0.05).sin()).collect();
//! let right = left.clone();
//! assert!(analyze_stereo(&left, &right).correlation > 0.99);
//!
//! let mut meter = LoudnessMeter::new(LoudnessConfig::default()).unwrap();
//! let reading = meter.process(&left, &right, 44100.0);
//! assert!(reading.momentary > -70.0);
//! ```

pub mod bands;
pub mod block;
pub mod dynamics;
pub mod emotion;
pub mod error;
pub mod loudness;
pub mod math;
pub mod matrix;
pub mod metrics;
pub mod phase;
pub mod relations;
pub mod spectrum;
pub mod stereo;
pub mod tracker;
pub mod trend;
pub mod window;

pub use bands::{BandConfig, BandLayout, BinMap, FrequencyBand, FrequencyRange, Spacing};
pub use block::{AudioBlock, SUPPORTED_FFT_SIZES, SUPPORTED_SAMPLE_RATES};
pub use dynamics::{ClipConfig, Dynamics};
pub use emotion::{
    Dimension, Emotion, EmotionAnalyzer, EmotionConfig, EmotionFeatures, EmotionReport,
    EmotionalProfile, Genre, GenreMatch,
};
pub use error::{AnalysisWarning, Error, HistoryKind, Result};
pub use loudness::{LoudnessConfig, LoudnessDisplay, LoudnessMeter, LoudnessReading};
pub use matrix::SymmetricMatrix;
pub use metrics::{BlockAnalyzer, BlockMetrics};
pub use phase::{PhaseCoherenceAnalyzer, PhaseConfig, PhaseReport, ProblemRegion};
pub use relations::{
    BandPair, Connection, RelationConfig, Relationship, RelationshipEngine, RelationshipMatrix,
    RelationshipReport, RelationshipType,
};
pub use stereo::{StereoAnalysis, TruePeak};
pub use tracker::{BandEnergyTracker, BandState, TrackerConfig};
pub use trend::{BandTrend, Classification, MigrationReport, TrendConfig, TrendEngine};
pub use window::WindowFunction;
