//! Centralized error type for the resonance umbrella crate.
//!
//! Wraps the analysis errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Analysis(#[from] resonance_analysis::Error),

    #[error("Failed to spawn analysis thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// The live analyzer has shut down.
    #[error("Analysis thread is not running")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for blocks rejected by validation.
    pub fn is_invalid_block(&self) -> bool {
        matches!(self, Self::Analysis(resonance_analysis::Error::InvalidBlock(_)))
    }
}
