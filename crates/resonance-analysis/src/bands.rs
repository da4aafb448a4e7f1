//! Frequency band layout.
//!
//! Builds the contiguous band set shared by every band-based analysis and
//! maps FFT bins onto it. A bin belongs to exactly one band, or to none when
//! its frequency lies outside `[min_freq, max_freq]`.

use crate::{Error, Result};

/// Band spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Spacing {
    /// Equal width in log-frequency (perceptual).
    #[default]
    Logarithmic,
    /// Equal width in Hz.
    Linear,
}

/// Band layout parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BandConfig {
    pub count: usize,
    pub min_freq: f32,
    pub max_freq: f32,
    pub spacing: Spacing,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            count: 32,
            min_freq: 20.0,
            max_freq: 20000.0,
            spacing: Spacing::Logarithmic,
        }
    }
}

impl BandConfig {
    /// Check count and frequency bounds.
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(Error::InvalidConfig("band count must be > 0".into()));
        }
        if !self.min_freq.is_finite() || !self.max_freq.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "band range must be finite (min={}, max={})",
                self.min_freq, self.max_freq
            )));
        }
        if self.min_freq >= self.max_freq {
            return Err(Error::InvalidConfig(format!(
                "min_freq {} must be below max_freq {}",
                self.min_freq, self.max_freq
            )));
        }
        if self.spacing == Spacing::Logarithmic && self.min_freq <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "logarithmic spacing needs min_freq > 0, got {}",
                self.min_freq
            )));
        }
        if self.min_freq < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "min_freq {} must not be negative",
                self.min_freq
            )));
        }
        Ok(())
    }
}

/// One frequency band. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct FrequencyBand {
    pub index: usize,
    pub low_freq: f32,
    pub high_freq: f32,
    pub center_freq: f32,
    /// Range name ("Sub Bass", "Bass", ... "Air").
    pub name: String,
    /// Nearest note to the center frequency, e.g. `"A4"`.
    pub note: String,
}

/// Named region of the audible spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum FrequencyRange {
    SubBass,
    Bass,
    LowMids,
    Mids,
    UpperMids,
    Presence,
    Air,
}

impl FrequencyRange {
    pub const ALL: [Self; 7] = [
        Self::SubBass,
        Self::Bass,
        Self::LowMids,
        Self::Mids,
        Self::UpperMids,
        Self::Presence,
        Self::Air,
    ];

    /// Range containing `freq`.
    pub fn of(freq: f32) -> Self {
        match freq {
            f if f < 60.0 => Self::SubBass,
            f if f < 250.0 => Self::Bass,
            f if f < 500.0 => Self::LowMids,
            f if f < 2000.0 => Self::Mids,
            f if f < 4000.0 => Self::UpperMids,
            f if f < 10000.0 => Self::Presence,
            _ => Self::Air,
        }
    }

    /// Display name, e.g. "Sub Bass".
    pub fn name(self) -> &'static str {
        match self {
            Self::SubBass => "Sub Bass",
            Self::Bass => "Bass",
            Self::LowMids => "Low Mids",
            Self::Mids => "Mid Range",
            Self::UpperMids => "Upper Mids",
            Self::Presence => "Presence",
            Self::Air => "Air",
        }
    }

    /// Position in [`ALL`](Self::ALL).
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Range name for a frequency.
pub fn range_name(freq: f32) -> &'static str {
    FrequencyRange::of(freq).name()
}

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Nearest equal-tempered note (A4 = 440 Hz) as `(name, octave)`.
pub fn nearest_note(freq: f32) -> (&'static str, i32) {
    if !freq.is_finite() || freq <= 0.0 {
        return ("A", 4);
    }
    let half_steps = (12.0 * (freq / 440.0).log2()).round() as i32;
    // A is index 9 within its octave
    let from_c0 = half_steps + 9;
    let note = from_c0.rem_euclid(12) as usize;
    let octave = from_c0.div_euclid(12) + 4;
    (NOTE_NAMES[note], octave)
}

/// The ordered, contiguous band set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BandLayout {
    config: BandConfig,
    bands: Vec<FrequencyBand>,
}

impl BandLayout {
    /// Build the band set, failing with `InvalidConfig` on bad parameters.
    pub fn new(config: BandConfig) -> Result<Self> {
        config.validate()?;

        let count = config.count;
        let edge = |k: usize| -> f32 {
            if k == count {
                // exact top edge, no accumulated rounding
                return config.max_freq;
            }
            match config.spacing {
                Spacing::Logarithmic => {
                    let log_min = (config.min_freq as f64).log10();
                    let log_max = (config.max_freq as f64).log10();
                    let step = (log_max - log_min) / count as f64;
                    10f64.powf(log_min + step * k as f64) as f32
                }
                Spacing::Linear => {
                    let step = (config.max_freq - config.min_freq) as f64 / count as f64;
                    (config.min_freq as f64 + step * k as f64) as f32
                }
            }
        };

        let bands = (0..count)
            .map(|index| {
                let low_freq = edge(index);
                let high_freq = edge(index + 1);
                let center_freq = match config.spacing {
                    Spacing::Logarithmic => (low_freq * high_freq).sqrt(),
                    Spacing::Linear => (low_freq + high_freq) * 0.5,
                };
                let (note, octave) = nearest_note(center_freq);
                FrequencyBand {
                    index,
                    low_freq,
                    high_freq,
                    center_freq,
                    name: range_name(center_freq).to_string(),
                    note: format!("{note}{octave}"),
                }
            })
            .collect();

        Ok(Self { config, bands })
    }

    pub fn config(&self) -> &BandConfig {
        &self.config
    }

    pub fn bands(&self) -> &[FrequencyBand] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Band containing `freq`, or `None` outside `[min_freq, max_freq]`.
    pub fn band_index_for_frequency(&self, freq: f32) -> Option<usize> {
        if !freq.is_finite() || freq < self.config.min_freq || freq > self.config.max_freq {
            return None;
        }
        let count = self.bands.len();
        let position = match self.config.spacing {
            Spacing::Logarithmic => {
                let log_min = self.config.min_freq.log10();
                let log_max = self.config.max_freq.log10();
                (freq.log10() - log_min) / (log_max - log_min)
            }
            Spacing::Linear => {
                (freq - self.config.min_freq) / (self.config.max_freq - self.config.min_freq)
            }
        };
        let mut index = ((position * count as f32).floor() as usize).min(count - 1);

        // Float rounding near an edge can land one band off; the stored
        // edges are authoritative.
        if freq < self.bands[index].low_freq && index > 0 {
            index -= 1;
        } else if freq >= self.bands[index].high_freq && index + 1 < count {
            index += 1;
        }
        Some(index)
    }

    /// Precompute the bin-to-band assignment for one FFT geometry.
    pub fn bin_map(&self, sample_rate: f32, fft_size: usize) -> BinMap {
        let bins = fft_size / 2;
        let assignment = (0..bins)
            .map(|bin| self.band_index_for_frequency(bin_frequency(bin, sample_rate, fft_size)))
            .collect();
        BinMap {
            sample_rate,
            fft_size,
            assignment,
            band_count: self.bands.len(),
        }
    }
}

/// Center frequency of an FFT bin.
#[inline]
pub fn bin_frequency(bin: usize, sample_rate: f32, fft_size: usize) -> f32 {
    bin as f32 * sample_rate / fft_size as f32
}

/// Cached bin → band assignment for a given sample rate and FFT size.
#[derive(Debug, Clone, PartialEq)]
pub struct BinMap {
    sample_rate: f32,
    fft_size: usize,
    assignment: Vec<Option<usize>>,
    band_count: usize,
}

impl BinMap {
    /// Whether this mapping was built for the given geometry.
    pub fn matches(&self, sample_rate: f32, fft_size: usize) -> bool {
        self.fft_size == fft_size && self.sample_rate == sample_rate
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Band owning `bin`, if any.
    pub fn band_of(&self, bin: usize) -> Option<usize> {
        self.assignment.get(bin).copied().flatten()
    }

    /// `(bin, band)` pairs for every bin that falls inside a band.
    pub fn assigned(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(|(bin, band)| band.map(|b| (bin, b)))
    }
}
