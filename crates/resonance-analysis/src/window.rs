//! Window functions applied to time-domain frames before an FFT.

use core::f32::consts::PI;

/// Analysis window shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum WindowFunction {
    #[default]
    Hann,
    Hamming,
    Blackman,
    /// No tapering.
    Rectangular,
}

impl WindowFunction {
    /// Window coefficients for a frame of `size` samples.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        if size < 2 {
            return vec![1.0; size];
        }
        let denom = (size - 1) as f32;
        (0..size)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / denom;
                match self {
                    Self::Hann => 0.5 * (1.0 - phase.cos()),
                    Self::Hamming => 0.54 - 0.46 * phase.cos(),
                    Self::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
                    Self::Rectangular => 1.0,
                }
            })
            .collect()
    }
}
