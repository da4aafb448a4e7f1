//! The analysis frame handed to the engine by the acquisition side.

use std::ops::RangeInclusive;

use crate::{Error, Result};

/// FFT sizes a block may declare.
pub const SUPPORTED_FFT_SIZES: [usize; 5] = [1024, 2048, 4096, 8192, 16384];

/// Sample rates a block may declare, in Hz.
pub const SUPPORTED_SAMPLE_RATES: RangeInclusive<f32> = 8_000.0..=384_000.0;

/// One stereo analysis frame.
///
/// `time_*` hold `fft_size` samples in `[-1, 1]`; `freq_*` hold `fft_size / 2`
/// magnitudes in dB, where `-inf` marks an empty bin.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AudioBlock {
    pub time_left: Vec<f32>,
    pub time_right: Vec<f32>,
    pub freq_left: Vec<f32>,
    pub freq_right: Vec<f32>,
    pub sample_rate: f32,
    pub fft_size: usize,
    /// Capture time in milliseconds.
    pub timestamp: f64,
}

impl AudioBlock {
    /// Check that the arrays agree with the declared geometry.
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(Error::InvalidBlock(format!(
                "sample rate {} Hz outside {}..={} Hz",
                self.sample_rate,
                SUPPORTED_SAMPLE_RATES.start(),
                SUPPORTED_SAMPLE_RATES.end()
            )));
        }
        if !SUPPORTED_FFT_SIZES.contains(&self.fft_size) {
            return Err(Error::InvalidBlock(format!(
                "unsupported FFT size {} (expected one of {:?})",
                self.fft_size, SUPPORTED_FFT_SIZES
            )));
        }
        let bins = self.fft_size / 2;
        for (name, len, expected) in [
            ("time_left", self.time_left.len(), self.fft_size),
            ("time_right", self.time_right.len(), self.fft_size),
            ("freq_left", self.freq_left.len(), bins),
            ("freq_right", self.freq_right.len(), bins),
        ] {
            if len != expected {
                return Err(Error::InvalidBlock(format!(
                    "{name} has {len} values, expected {expected}"
                )));
            }
        }
        Ok(())
    }

    /// Number of frequency bins.
    pub fn bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Block duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.fft_size as f64 / self.sample_rate as f64
    }
}
