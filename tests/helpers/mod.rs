//! Test helpers and fixtures for Resonance integration tests
//!
//! Signal generators, block builders with synthetic dB spectra, and small
//! measurement helpers.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations
//! - `DSP_EPSILON` (1e-4): Accumulated float math
//! - `LUFS_EPSILON` (0.05): Loudness values in LU
//! - `CORRELATION_EPSILON` (0.01): Correlation of sampled sinusoids

#![allow(dead_code)]

pub mod tolerances;

use resonance::prelude::*;

/// Default test sample rate
pub const TEST_SAMPLE_RATE: f32 = 44100.0;

/// Default FFT size (one block = 2048 samples)
pub const TEST_FFT_SIZE: usize = 2048;

/// dB value of an empty bin.
pub const SILENT_DB: f32 = -144.0;

/// Route `tracing` output to the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine with default configuration.
pub fn test_engine() -> AnalysisEngine {
    AnalysisEngine::builder()
        .build()
        .expect("Failed to create test engine")
}

/// Generate a sine wave at `frequency` with the given amplitude.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize, amplitude: f32) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Generate silence (zero samples).
pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// Generate white noise (samples in -amplitude..amplitude).
pub fn generate_noise(num_samples: usize, seed: u64, amplitude: f32) -> Vec<f32> {
    // Simple LCG for reproducible "random" noise
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            (((rng >> 33) as f32 / (1u64 << 31) as f32) * 2.0 - 1.0) * amplitude
        })
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// FFT bin nearest to `frequency`.
pub fn bin_for(frequency: f32, sample_rate: f32, fft_size: usize) -> usize {
    (frequency * fft_size as f32 / sample_rate).round() as usize
}

/// dB spectrum that is silent except for `(frequency, db)` peaks.
pub fn tone_spectrum(peaks: &[(f32, f32)], sample_rate: f32, fft_size: usize) -> Vec<f32> {
    let mut spectrum = vec![SILENT_DB; fft_size / 2];
    for &(frequency, db) in peaks {
        let bin = bin_for(frequency, sample_rate, fft_size);
        if let Some(slot) = spectrum.get_mut(bin) {
            *slot = db;
        }
    }
    spectrum
}

/// Block from explicit channels and spectra at the default rate and size.
pub fn block_from(
    time_left: Vec<f32>,
    time_right: Vec<f32>,
    freq_left: Vec<f32>,
    freq_right: Vec<f32>,
    timestamp: f64,
) -> AudioBlock {
    AudioBlock {
        time_left,
        time_right,
        freq_left,
        freq_right,
        sample_rate: TEST_SAMPLE_RATE,
        fft_size: TEST_FFT_SIZE,
        timestamp,
    }
}

/// Silent block.
pub fn silent_block(timestamp: f64) -> AudioBlock {
    block_from(
        generate_silence(TEST_FFT_SIZE),
        generate_silence(TEST_FFT_SIZE),
        vec![SILENT_DB; TEST_FFT_SIZE / 2],
        vec![SILENT_DB; TEST_FFT_SIZE / 2],
        timestamp,
    )
}

/// Identical sine on both channels with a matching single-peak spectrum.
pub fn sine_block(frequency: f32, amplitude: f32, timestamp: f64) -> AudioBlock {
    let time = generate_sine(
        frequency as f64,
        TEST_SAMPLE_RATE as f64,
        TEST_FFT_SIZE,
        amplitude,
    );
    let db = 20.0 * amplitude.max(1e-6).log10();
    let spectrum = tone_spectrum(&[(frequency, db)], TEST_SAMPLE_RATE, TEST_FFT_SIZE);
    block_from(time.clone(), time, spectrum.clone(), spectrum, timestamp)
}

/// Duration of one default block in ms.
pub fn block_ms() -> f64 {
    TEST_FFT_SIZE as f64 / TEST_SAMPLE_RATE as f64 * 1000.0
}

/// Run `count` sine blocks through `engine`, returning the last metrics.
pub fn feed_sine(engine: &mut AnalysisEngine, frequency: f32, amplitude: f32, count: usize) -> Metrics {
    let start = engine.blocks_processed();
    let mut last = None;
    for i in 0..count {
        let timestamp = (start + i as u64) as f64 * block_ms();
        last = Some(
            engine
                .process(&sine_block(frequency, amplitude, timestamp))
                .expect("valid block"),
        );
    }
    last.expect("count > 0")
}
