//! Loudness integration tests
//!
//! Gated integration, display smoothing and convergence on steady input.

use approx::assert_abs_diff_eq;
use resonance::prelude::*;

use crate::helpers::tolerances::*;
use crate::helpers::*;

/// Equal-weight loudness of a full-scale-relative sine on both channels.
fn sine_lufs(amplitude: f32) -> f32 {
    // two channels, each with mean power amplitude² / 2
    let power = (amplitude as f64).powi(2);
    (-0.691 + 10.0 * power.log10()) as f32
}

/// A steady sine settles at its expected loudness on every timescale.
#[test]
fn test_steady_sine_loudness() {
    let mut engine = test_engine();
    let metrics = feed_sine(&mut engine, 1000.0, 0.5, 80);
    let expected = sine_lufs(0.5);

    assert_abs_diff_eq!(metrics.loudness.momentary, expected, epsilon = 0.2);
    assert_abs_diff_eq!(metrics.loudness.short_term, expected, epsilon = 0.2);
    assert_abs_diff_eq!(metrics.loudness.integrated, expected, epsilon = 0.2);
}

/// Repeating one block drives every smoothed value to the instantaneous one.
#[test]
fn test_display_converges_on_repeated_block() {
    let mut engine = test_engine();
    let metrics = feed_sine(&mut engine, 1000.0, 0.5, 250);

    let raw = metrics.loudness;
    let shown = metrics.loudness_display;
    assert_abs_diff_eq!(shown.momentary, raw.momentary, epsilon = LUFS_EPSILON);
    assert_abs_diff_eq!(shown.short_term, raw.short_term, epsilon = LUFS_EPSILON);
    assert_abs_diff_eq!(shown.integrated, raw.integrated, epsilon = LUFS_EPSILON);

    for (smoothed, instant) in metrics.smoothed_energies.iter().zip(&metrics.band_energies) {
        assert!((smoothed - instant).abs() < DSP_EPSILON);
    }
}

/// Quiet passages fall below the relative gate and do not drag the
/// integrated value down.
#[test]
fn test_relative_gate_excludes_quiet_passage() {
    let mut engine = test_engine();
    feed_sine(&mut engine, 1000.0, 0.5, 40);
    let metrics = feed_sine(&mut engine, 1000.0, 0.005, 40);

    let meter = engine.loudness_meter();
    let gate = meter.gate_report();
    assert!(gate.kept_blocks <= gate.total_blocks);
    assert!(gate.kept_blocks < gate.total_blocks, "quiet blocks should be gated");
    assert!(gate.kept_mean_power >= gate.relative_threshold);

    // Exactly the blocks above the threshold were kept.
    let above = meter
        .block_powers()
        .filter(|&p| p > gate.relative_threshold)
        .count();
    assert_eq!(above, gate.kept_blocks);

    assert!(metrics.loudness.integrated > gate.ungated_lufs + 2.0);
    assert!((metrics.loudness.integrated - sine_lufs(0.5)).abs() < 1.0);
}

/// An absolute gate removes blocks below it before the relative gate.
#[test]
fn test_absolute_gate() {
    let mut engine = AnalysisEngine::builder()
        .absolute_gate(-30.0)
        .build()
        .unwrap();
    let metrics = feed_sine(&mut engine, 1000.0, 0.005, 40);
    // about -46.7 LUFS, entirely below the gate
    assert_eq!(metrics.loudness.integrated, LUFS_FLOOR);
    assert!(metrics.loudness.momentary > LUFS_FLOOR);
}

/// Momentary loudness reacts faster than integrated loudness.
#[test]
fn test_momentary_reacts_first() {
    let mut engine = test_engine();
    feed_sine(&mut engine, 1000.0, 0.1, 60);
    let metrics = feed_sine(&mut engine, 1000.0, 0.8, 10);

    assert!(metrics.loudness.momentary > metrics.loudness.integrated);
    assert!((metrics.loudness.momentary - sine_lufs(0.8)).abs() < 0.2);
}

/// The metric history records one reading per block.
#[test]
fn test_metric_history_tracks_loudness() {
    let mut engine = test_engine();
    feed_sine(&mut engine, 1000.0, 0.5, 15);

    let history = engine.history();
    assert_eq!(history.len(), 15);
    let last = history.loudness().back().unwrap();
    assert!(last.momentary > LUFS_FLOOR);
    assert!(history.correlation().iter().all(|&c| c > 0.99));
}
