//! Engine integration tests
//!
//! Per-block metrics through the full pipeline, silence handling,
//! malformed input, reset and reconfiguration.

use resonance::analysis::HistoryKind;
use resonance::prelude::*;

use crate::helpers::tolerances::*;
use crate::helpers::*;

/// Silence reports the loudness floor, zero correlation and a warning.
#[test]
fn test_silent_input_reports_floor() {
    let mut engine = test_engine();

    for i in 0..10 {
        let metrics = engine.process(&silent_block(i as f64 * block_ms())).unwrap();
        assert_eq!(metrics.loudness.momentary, LUFS_FLOOR);
        assert_eq!(metrics.loudness.short_term, LUFS_FLOOR);
        assert_eq!(metrics.loudness.integrated, LUFS_FLOOR);
        assert_eq!(metrics.loudness_display.integrated, LUFS_FLOOR);
        assert_eq!(metrics.correlation, 0.0);
        assert_eq!(metrics.clip_count, 0);
        assert!(metrics.band_energies.iter().all(|&e| e == 0.0));
        assert!(metrics.is_degenerate());
    }
}

/// Identical channels are perfectly correlated and mono.
#[test]
fn test_identical_channels_correlate() {
    let mut engine = test_engine();
    let metrics = feed_sine(&mut engine, 1000.0, 0.5, 1);

    assert!(metrics.correlation > 1.0 - CORRELATION_EPSILON);
    assert!(metrics.stereo_width < 1.0);
    assert!(metrics.balance.abs() < DSP_EPSILON);
    assert!(metrics.crest_factor > 1.3 && metrics.crest_factor < 1.5);
    assert!((metrics.true_peak.left - 0.5).abs() < 0.01);
}

/// Polarity-inverted channels are anti-correlated and fully wide.
#[test]
fn test_inverted_channels_anticorrelate() {
    let mut engine = test_engine();
    let left = generate_sine(500.0, TEST_SAMPLE_RATE as f64, TEST_FFT_SIZE, 0.5);
    let right: Vec<f32> = left.iter().map(|s| -s).collect();
    let spectrum = tone_spectrum(&[(500.0, -6.0)], TEST_SAMPLE_RATE, TEST_FFT_SIZE);

    let metrics = engine
        .process(&block_from(left, right, spectrum.clone(), spectrum, 0.0))
        .unwrap();
    assert!(metrics.correlation < -1.0 + CORRELATION_EPSILON);
    assert!(metrics.stereo_width > 99.0);
}

/// Five consecutive full-scale samples in one channel are one clip event.
#[test]
fn test_single_clip_event() {
    let mut engine = test_engine();
    let mut left = generate_sine(440.0, TEST_SAMPLE_RATE as f64, TEST_FFT_SIZE, 0.1);
    left[1000..1005].fill(1.0);
    let right = generate_silence(TEST_FFT_SIZE);
    let spectrum = tone_spectrum(&[(440.0, -20.0)], TEST_SAMPLE_RATE, TEST_FFT_SIZE);

    let metrics = engine
        .process(&block_from(left, right, spectrum.clone(), spectrum, 0.0))
        .unwrap();
    assert_eq!(metrics.clip_count, 1);
    assert_eq!(metrics.true_peak.left, 1.0);
}

/// The spectral centroid of a single tone sits on the tone.
#[test]
fn test_centroid_follows_tone() {
    let mut engine = test_engine();
    let metrics = feed_sine(&mut engine, 2000.0, 0.5, 1);
    let bin = bin_for(2000.0, TEST_SAMPLE_RATE, TEST_FFT_SIZE);
    let expected = bin as f32 * TEST_SAMPLE_RATE / TEST_FFT_SIZE as f32;
    assert!((metrics.spectral_centroid - expected).abs() < 1.0);
}

/// Spectral flux is 0 on the first block and on an unchanged spectrum.
#[test]
fn test_spectral_flux() {
    let mut engine = test_engine();
    let first = feed_sine(&mut engine, 1000.0, 0.5, 1);
    assert_eq!(first.spectral_flux, 0.0);

    let repeat = feed_sine(&mut engine, 1000.0, 0.5, 1);
    assert_eq!(repeat.spectral_flux, 0.0);

    let changed = feed_sine(&mut engine, 3000.0, 0.5, 1);
    assert!(changed.spectral_flux > 0.0);
}

/// Malformed blocks are rejected and leave the engine untouched.
#[test]
fn test_malformed_blocks_rejected() {
    let mut engine = test_engine();
    feed_sine(&mut engine, 1000.0, 0.5, 3);

    let mut short_spectrum = sine_block(1000.0, 0.5, 0.0);
    short_spectrum.freq_right.pop();
    let mut bad_size = sine_block(1000.0, 0.5, 0.0);
    bad_size.fft_size = 3000;
    let mut bad_rate = sine_block(1000.0, 0.5, 0.0);
    bad_rate.sample_rate = 0.0;

    for block in [short_spectrum, bad_size, bad_rate] {
        let err = engine.process(&block).unwrap_err();
        assert!(err.is_invalid_block(), "unexpected error: {err}");
    }
    assert_eq!(engine.blocks_processed(), 3);
    assert_eq!(engine.history().len(), 3);
}

/// Non-finite samples never reach the output.
#[test]
fn test_non_finite_samples_sanitized() {
    let mut engine = test_engine();
    let mut block = sine_block(1000.0, 0.5, 0.0);
    block.time_left[10] = f32::NAN;
    block.time_right[20] = f32::INFINITY;
    block.freq_left[5] = f32::NAN;

    let metrics = engine.process(&block).unwrap();
    assert!(metrics.correlation.is_finite());
    assert!(metrics.loudness.momentary.is_finite());
    assert!(metrics.crest_factor.is_finite());
    assert!(metrics.band_energies.iter().all(|e| e.is_finite()));
}

/// History-based analyses warn until they have enough data.
#[test]
fn test_insufficient_history_warnings() {
    let mut engine = test_engine();
    let first = feed_sine(&mut engine, 1000.0, 0.5, 1);
    assert!(first.lacks_history(HistoryKind::Trend));
    assert!(first.lacks_history(HistoryKind::Relationships));
    assert!(first.lacks_history(HistoryKind::PhaseCoherence));
    assert!(first.phase.matrix.is_none());

    let later = feed_sine(&mut engine, 1000.0, 0.5, 10);
    assert!(!later.lacks_history(HistoryKind::Trend));
    assert!(!later.lacks_history(HistoryKind::Relationships));
    assert!(!later.lacks_history(HistoryKind::PhaseCoherence));
    assert!(later.warnings.is_empty());
}

/// Reset returns every output to the silent floor.
#[test]
fn test_reset_clears_state() {
    let mut engine = test_engine();
    feed_sine(&mut engine, 1000.0, 0.5, 20);
    engine.reset();

    assert_eq!(engine.blocks_processed(), 0);
    assert!(engine.spectrogram().is_empty());
    assert_eq!(engine.emotion().history().len(), 0);

    let metrics = engine.process(&silent_block(0.0)).unwrap();
    assert_eq!(metrics.block_index, 0);
    assert_eq!(metrics.loudness.integrated, LUFS_FLOOR);
    assert_eq!(metrics.loudness_display.momentary, LUFS_FLOOR);
    assert!(metrics.smoothed_energies.iter().all(|&e| e == 0.0));
}

/// Histories never exceed their configured bounds.
#[test]
fn test_histories_bounded() {
    let mut engine = AnalysisEngine::builder()
        .metric_history(5, 4)
        .build()
        .unwrap();
    feed_sine(&mut engine, 1000.0, 0.5, 12);

    assert_eq!(engine.history().len(), 5);
    assert_eq!(engine.spectrogram().len(), 4);
    assert_eq!(engine.history().correlation().len(), 5);
    assert_eq!(engine.tracker().history_len(), 12);
}

/// The emotional profile updates on block time and reports genre matches.
#[test]
fn test_emotion_follows_block_time() {
    let mut engine = test_engine();

    let first = feed_sine(&mut engine, 1000.0, 0.5, 1);
    let dominant = first.emotion.dominant.expect("first block updates the profile");
    assert!((0.0..=1.0).contains(&dominant.intensity));
    assert_eq!(first.emotion.genres.len(), 3);
    assert_eq!(first.likely_genre(), Some(first.emotion.genres[0].genre));

    // Twelve blocks of ~46 ms span two 500 ms update slots.
    feed_sine(&mut engine, 1000.0, 0.5, 11);
    assert_eq!(engine.emotion().history().len(), 2);
    assert!(first.emotion.arcs.is_empty());
}

/// A different band count is a full rebuild.
#[test]
fn test_reconfigure_band_count() {
    let mut engine = test_engine();
    feed_sine(&mut engine, 1000.0, 0.5, 5);

    let config = AnalyzerBuilder::default().band_count(10).into_config();
    engine.reconfigure(config).unwrap();

    let metrics = feed_sine(&mut engine, 1000.0, 0.5, 1);
    assert_eq!(metrics.band_energies.len(), 10);
    assert_eq!(metrics.smoothed_energies.len(), 10);
    assert_eq!(metrics.relationships.matrix.size(), 10);
    assert_eq!(metrics.block_index, 0);
}

/// Blocks at other supported sizes and rates are accepted mid-stream.
#[test]
fn test_block_geometry_change() {
    let mut engine = test_engine();
    feed_sine(&mut engine, 1000.0, 0.5, 3);

    let time = generate_sine(1000.0, 48000.0, 4096, 0.5);
    let spectrum = tone_spectrum(&[(1000.0, -6.0)], 48000.0, 4096);
    let block = AudioBlock {
        time_left: time.clone(),
        time_right: time,
        freq_left: spectrum.clone(),
        freq_right: spectrum,
        sample_rate: 48000.0,
        fft_size: 4096,
        timestamp: 500.0,
    };
    let metrics = engine.process(&block).unwrap();
    assert!(metrics.correlation > 1.0 - CORRELATION_EPSILON);
    assert_eq!(metrics.spectral_flux, 0.0);

    // Phase coherence starts over on the new geometry.
    assert!(metrics.phase.matrix.is_none());
    assert!(metrics.lacks_history(HistoryKind::PhaseCoherence));
}

/// Sample rates outside the supported range are rejected before analysis.
#[test]
fn test_out_of_range_sample_rate_rejected() {
    let mut engine = test_engine();
    feed_sine(&mut engine, 1000.0, 0.5, 2);

    for rate in [1.0e18, 1.0e10, 1_000.0] {
        let mut block = silent_block(100.0);
        block.sample_rate = rate;
        assert!(block.validate().is_err());
        let err = engine.process(&block).unwrap_err();
        assert!(err.is_invalid_block());
    }
    assert_eq!(engine.blocks_processed(), 2);
}
