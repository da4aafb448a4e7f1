//! Live analyzer integration tests
//!
//! Latest-wins submission, subscribers, reset and shutdown of the
//! analysis thread.

use std::sync::Arc;
use std::time::{Duration, Instant};

use resonance::prelude::*;

use crate::helpers::*;

const TIMEOUT: Duration = Duration::from_secs(10);

fn spawn() -> LiveAnalyzer {
    init_tracing();
    AnalyzerBuilder::default()
        .thread_name("resonance-test")
        .spawn()
        .expect("Failed to spawn analyzer")
}

/// Every subscriber sees the same snapshot.
#[test]
fn test_multiple_subscribers() {
    let analyzer = spawn();
    let handle = analyzer.handle();
    let first = handle.subscribe();
    let second = handle.clone().subscribe();

    analyzer.submit(sine_block(1000.0, 0.5, 0.0)).unwrap();

    let a = first.recv_timeout(TIMEOUT).unwrap();
    let b = second.recv_timeout(TIMEOUT).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &handle.latest()));
    assert!(a.correlation > 0.99);
}

/// Flooding the queue never blocks and drops stale blocks instead.
#[test]
fn test_latest_wins_under_load() {
    let analyzer = spawn();
    let handle = analyzer.handle();
    let updates = handle.subscribe();

    let total = 200u64;
    let mut replaced = 0u64;
    for i in 0..total {
        match analyzer.submit(sine_block(1000.0, 0.5, i as f64)).unwrap() {
            SubmitOutcome::Queued => {}
            SubmitOutcome::Replaced => replaced += 1,
        }
    }

    // The final block is always analyzed.
    let deadline = Instant::now() + TIMEOUT;
    while handle.latest().timestamp != (total - 1) as f64 {
        assert!(Instant::now() < deadline, "final block never analyzed");
        std::thread::sleep(Duration::from_millis(1));
    }
    // Snapshots beyond the subscriber's buffer were skipped, not queued.
    assert!(updates.try_iter().count() <= 16);
    assert_eq!(handle.blocks_dropped(), replaced);
    assert_eq!(handle.blocks_processed() + handle.blocks_dropped(), total);
}

/// Snapshots arrive in submission order.
#[test]
fn test_snapshots_in_order() {
    let analyzer = spawn();
    let updates = analyzer.handle().subscribe();

    for i in 0..5 {
        analyzer.submit(sine_block(1000.0, 0.5, i as f64)).unwrap();
        let metrics = updates.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(metrics.timestamp, i as f64);
        assert_eq!(metrics.block_index, i);
    }
}

/// A slow subscriber misses snapshots but never stalls the analyzer.
#[test]
fn test_slow_subscriber_does_not_block() {
    let analyzer = AnalyzerBuilder::default().sink_capacity(1).spawn().unwrap();
    let handle = analyzer.handle();
    let slow = handle.subscribe();
    let fast = handle.subscribe();

    for i in 0..5 {
        analyzer.submit(sine_block(1000.0, 0.5, i as f64)).unwrap();
        let metrics = fast.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(metrics.timestamp, i as f64);
    }

    // Only the first snapshot fit.
    assert_eq!(slow.try_recv().unwrap().timestamp, 0.0);
    assert!(slow.try_recv().is_err());
    assert_eq!(handle.blocks_processed(), 5);
}

/// After a reset the next block starts from empty state.
#[test]
fn test_reset_discards_history() {
    let analyzer = spawn();
    let handle = analyzer.handle();
    let updates = handle.subscribe();

    for i in 0..20 {
        analyzer.submit(sine_block(1000.0, 0.5, i as f64)).unwrap();
        updates.recv_timeout(TIMEOUT).unwrap();
    }

    analyzer.reset().unwrap();
    analyzer.submit(silent_block(1000.0)).unwrap();
    let metrics = loop {
        let metrics = updates.recv_timeout(TIMEOUT).unwrap();
        if metrics.timestamp == 1000.0 {
            break metrics;
        }
    };
    assert_eq!(metrics.block_index, 0);
    assert_eq!(metrics.loudness.integrated, -70.0);
    assert_eq!(metrics.loudness_display.short_term, -70.0);
    assert!(metrics.smoothed_energies.iter().all(|&e| e == 0.0));
}

/// Shutdown joins the thread and disconnects subscribers.
#[test]
fn test_shutdown() {
    let analyzer = spawn();
    let handle = analyzer.handle();
    let updates = handle.subscribe();
    assert!(analyzer.is_running());

    analyzer.shutdown();
    assert!(!handle.is_running());
    assert!(updates.recv_timeout(TIMEOUT).is_err());
}

/// Handles stay usable after the analyzer is gone.
#[test]
fn test_handle_outlives_analyzer() {
    let analyzer = spawn();
    let handle = analyzer.handle();
    drop(analyzer);

    assert!(!handle.is_running());
    assert_eq!(handle.latest().block_index, 0);
}

/// Malformed blocks are rejected on the producer side.
#[test]
fn test_live_rejects_malformed_block() {
    let analyzer = spawn();
    let mut block = sine_block(1000.0, 0.5, 0.0);
    block.time_right.truncate(100);

    let err = analyzer.submit(block).unwrap_err();
    assert!(err.is_invalid_block());
    assert_eq!(analyzer.handle().blocks_dropped(), 0);
}

/// An out-of-range sample rate never reaches the worker, which keeps running.
#[test]
fn test_live_rejects_extreme_sample_rate() {
    let analyzer = spawn();
    let handle = analyzer.handle();
    let updates = handle.subscribe();

    let mut block = sine_block(1000.0, 0.5, 0.0);
    block.sample_rate = 1.0e18;
    assert!(analyzer.submit(block).unwrap_err().is_invalid_block());

    analyzer.submit(sine_block(1000.0, 0.5, 1.0)).unwrap();
    let metrics = updates.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(metrics.timestamp, 1.0);
    assert!(analyzer.is_running());
    assert!(handle.is_running());
}
