//! Band analysis integration tests
//!
//! Band energies, classification over time, band relationships and
//! phase coherence through the full engine.

use resonance::analysis::{BandConfig, TrackerConfig};
use resonance::prelude::*;

use crate::helpers::*;

/// Octave bands centered on 55 Hz · 2^k, so bands 2 and 3 sit at 220 and 440 Hz.
fn octave_engine(tracker_smoothing: f32) -> AnalysisEngine {
    let low = 55.0 / std::f32::consts::SQRT_2;
    AnalysisEngine::builder()
        .bands(BandConfig {
            count: 8,
            min_freq: low,
            max_freq: low * 256.0,
            spacing: Spacing::Logarithmic,
        })
        .tracker(TrackerConfig {
            smoothing: tracker_smoothing,
            ..TrackerConfig::default()
        })
        .build()
        .unwrap()
}

/// Reference tone at 0 dB in the top band plus the given `(frequency, linear)` tones.
fn spectrum_block(tones: &[(f32, f32)], index: usize) -> AudioBlock {
    let mut peaks = vec![(5000.0, 0.0)];
    peaks.extend(tones.iter().map(|&(f, level)| (f, 20.0 * level.log10())));
    let spectrum = tone_spectrum(&peaks, TEST_SAMPLE_RATE, TEST_FFT_SIZE);
    block_from(
        generate_silence(TEST_FFT_SIZE),
        generate_silence(TEST_FFT_SIZE),
        spectrum.clone(),
        spectrum,
        index as f64 * block_ms(),
    )
}

#[test]
fn test_octave_layout() {
    let engine = octave_engine(0.7);
    let centers: Vec<f32> = engine.bands().iter().map(|b| b.center_freq).collect();
    assert!((centers[2] - 220.0).abs() < 0.5);
    assert!((centers[3] - 440.0).abs() < 0.5);
    assert_eq!(engine.bands()[3].note, "A4");
    assert_eq!(engine.bands()[0].name, "Sub Bass");
}

/// The loudest band is exactly 1 and everything stays in [0, 1].
#[test]
fn test_band_energies_normalized() {
    let mut engine = test_engine();
    let metrics = engine
        .process(&spectrum_block(&[(220.0, 0.3), (1000.0, 0.6)], 0))
        .unwrap();

    let max = metrics.band_energies.iter().copied().fold(0.0f32, f32::max);
    assert_eq!(max, 1.0);
    assert!(metrics.band_energies.iter().all(|&e| (0.0..=1.0).contains(&e)));
}

/// A band ramping up is emerging, then fading once it ramps down.
#[test]
fn test_band_classification_over_time() {
    let mut engine = octave_engine(0.0);

    let mut metrics = None;
    for k in 0..10 {
        let level = 0.1 + 0.4 * k as f32 / 9.0;
        metrics = Some(engine.process(&spectrum_block(&[(220.0, level)], k)).unwrap());
    }
    let metrics = metrics.unwrap();
    assert_eq!(metrics.emerging(), &[2]);
    assert!(metrics.stable().contains(&7));
    assert!(metrics.fading().is_empty());

    let mut metrics = None;
    for k in 0..10 {
        let level = 0.5 - 0.4 * k as f32 / 9.0;
        metrics = Some(engine.process(&spectrum_block(&[(220.0, level)], 10 + k)).unwrap());
    }
    let metrics = metrics.unwrap();
    assert_eq!(metrics.fading(), &[2]);
    assert!(metrics.emerging().is_empty());
}

/// Bands at 220 and 440 Hz moving together are harmonically related.
#[test]
fn test_harmonic_relationship() {
    let mut engine = octave_engine(0.7);

    let mut metrics = None;
    for k in 0..12 {
        let level = 10f32.powf((-20.0 - 6.0 * (k % 4) as f32) / 20.0);
        metrics = Some(
            engine
                .process(&spectrum_block(&[(220.0, level), (440.0, level)], k))
                .unwrap(),
        );
    }
    let report = metrics.unwrap().relationships;

    let cell = report.matrix.get(2, 3).unwrap();
    assert!(cell.correlation > 0.99);
    assert_eq!(cell.kind, RelationshipType::Harmonic);
    assert!(report.active.iter().any(|p| p.a == 2 && p.b == 3));
    assert!(report.conflicting.is_empty());

    // A constant band has no relationship with anything.
    assert_eq!(report.matrix.get(2, 7).unwrap().kind, RelationshipType::Neutral);
    assert_eq!(report.matrix.get(5, 5).unwrap().correlation, 1.0);
}

/// Bands moving in opposition conflict.
#[test]
fn test_conflicting_relationship() {
    let mut engine = octave_engine(0.7);

    let mut metrics = None;
    for k in 0..12 {
        let a = if k % 2 == 0 { 0.8 } else { 0.1 };
        let b = 0.9 - a;
        metrics = Some(
            engine
                .process(&spectrum_block(&[(220.0, a), (880.0, b)], k))
                .unwrap(),
        );
    }
    let report = metrics.unwrap().relationships;
    let cell = report.matrix.get(2, 4).unwrap();
    assert!(cell.correlation < -0.9);
    assert_eq!(cell.kind, RelationshipType::Conflicting);
    assert!(report.conflicting.iter().any(|p| p.a == 2 && p.b == 4));
}

/// A steady tone dominates its band.
#[test]
fn test_dominant_band() {
    let mut engine = test_engine();
    let metrics = feed_sine(&mut engine, 1000.0, 0.5, 10);
    let band = engine.layout().band_index_for_frequency(1000.0).unwrap();
    assert_eq!(metrics.dominant_bands, vec![band]);
}

/// Identical channels are coherent in the band carrying the tone.
#[test]
fn test_phase_coherence_in_phase() {
    let mut engine = test_engine();
    let metrics = feed_sine(&mut engine, 1000.0, 0.5, 5);
    let band = engine.layout().band_index_for_frequency(1000.0).unwrap();

    let matrix = metrics.phase.matrix.as_ref().unwrap();
    assert!(*matrix.get(band, band).unwrap() > 0.99);
    assert!(metrics.phase.problem_regions.is_empty());
    assert!(metrics.overall_coherence > 0.0);
}

/// Polarity inversion shows up as a phase problem in the tone's band.
#[test]
fn test_phase_coherence_inverted() {
    let mut engine = test_engine();
    let band = engine.layout().band_index_for_frequency(1000.0).unwrap();

    let mut metrics = None;
    for k in 0..5 {
        let left = generate_sine(1000.0, TEST_SAMPLE_RATE as f64, TEST_FFT_SIZE, 0.5);
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        let spectrum = tone_spectrum(&[(1000.0, -6.0)], TEST_SAMPLE_RATE, TEST_FFT_SIZE);
        metrics = Some(
            engine
                .process(&block_from(left, right, spectrum.clone(), spectrum, k as f64 * block_ms()))
                .unwrap(),
        );
    }
    let metrics = metrics.unwrap();

    let matrix = metrics.phase.matrix.as_ref().unwrap();
    assert!(*matrix.get(band, band).unwrap() < -0.99);
    assert!(metrics.phase.problem_regions.iter().any(|r| r.band == band));
    assert!(metrics.overall_coherence < 0.0);
}

/// Phase cell trends appear once enough matrices exist.
#[test]
fn test_phase_trends_need_history() {
    let mut engine = test_engine();
    let early = feed_sine(&mut engine, 1000.0, 0.5, 4);
    assert!(early.phase.trends.is_none());

    let later = feed_sine(&mut engine, 1000.0, 0.5, 6);
    let trends = later.phase.trends.as_ref().unwrap();
    assert_eq!(trends.size(), engine.bands().len());
}

/// Identical sub-bass on both channels is fully mono.
#[test]
fn test_sub_bass_mono() {
    let mut engine = test_engine();
    let metrics = feed_sine(&mut engine, 60.0, 0.5, 1);
    assert!((metrics.sub_bass_ratio - 100.0).abs() < 1e-3);
}
