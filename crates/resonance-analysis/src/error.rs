//! Error types for resonance-analysis.

use thiserror::Error;

/// Error type for analysis construction and block validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid band, frequency, loudness or history parameters.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A block whose shape does not match what it claims to be.
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Non-fatal conditions reported alongside an analysis result.
///
/// These never abort processing; they let consumers tell a neutral result
/// caused by missing data apart from a genuinely neutral signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum AnalysisWarning {
    /// The block carried no energy; metrics fell back to floor values.
    DegenerateInput,
    /// An analysis ran before its minimum history was available.
    InsufficientHistory {
        analysis: HistoryKind,
        have: usize,
        need: usize,
    },
}

/// Which history-based analysis lacked data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum HistoryKind {
    Trend,
    Relationships,
    PhaseCoherence,
}

impl core::fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DegenerateInput => write!(f, "degenerate (silent) input"),
            Self::InsufficientHistory {
                analysis,
                have,
                need,
            } => write!(f, "{analysis:?}: {have} of {need} history frames"),
        }
    }
}
