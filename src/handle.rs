//! Read side of the live analyzer

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};

use crate::live::LiveState;
use crate::Metrics;

/// Cloneable, lock-free view of a running [`LiveAnalyzer`](crate::LiveAnalyzer).
///
/// Safe to hand to UI or logging threads; it never blocks the analysis thread.
#[derive(Clone)]
pub struct AnalysisHandle {
    state: Arc<LiveState>,
}

impl AnalysisHandle {
    pub(crate) fn new(state: Arc<LiveState>) -> Self {
        Self { state }
    }

    /// Most recent snapshot, or defaults before the first block and after a reset.
    pub fn latest(&self) -> Arc<Metrics> {
        self.state.latest.load_full()
    }

    /// Receive every future snapshot.
    ///
    /// The channel buffers a limited number of snapshots; while it is full
    /// new snapshots are skipped for this subscriber only. It disconnects
    /// when the analyzer shuts down.
    pub fn subscribe(&self) -> Receiver<Arc<Metrics>> {
        let (sender, receiver) = bounded(self.state.sink_capacity);
        let mut sinks = self.state.sinks.lock();
        if self.state.is_running() {
            sinks.push(sender);
        }
        receiver
    }

    /// Blocks analyzed and published since spawn.
    pub fn blocks_processed(&self) -> u64 {
        self.state.processed()
    }

    /// Blocks replaced before analysis or discarded by a reset.
    pub fn blocks_dropped(&self) -> u64 {
        self.state.dropped()
    }

    /// False once the analysis thread has stopped.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Subscribers still connected.
    pub fn subscriber_count(&self) -> usize {
        self.state.sinks.lock().len()
    }
}

impl core::fmt::Debug for AnalysisHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AnalysisHandle")
            .field("running", &self.is_running())
            .field("processed", &self.blocks_processed())
            .field("dropped", &self.blocks_dropped())
            .finish()
    }
}
