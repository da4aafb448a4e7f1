//! Live analysis on a dedicated thread.
//!
//! Blocks reach the thread through a bounded queue where the newest block
//! replaces any pending one, so the producer never waits. Results are
//! published to an `ArcSwap` for lock-free reads and to every subscribed
//! channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::analysis::AudioBlock;
use crate::{AnalysisEngine, AnalysisHandle, Error, Metrics, Result};

const CONTROL_CAPACITY: usize = 16;

/// State shared between the analysis thread, the producer and every handle.
pub(crate) struct LiveState {
    pub(crate) latest: ArcSwap<Metrics>,
    pub(crate) sinks: Mutex<Vec<Sender<Arc<Metrics>>>>,
    pub(crate) sink_capacity: usize,
    running: AtomicBool,
    generation: AtomicU64,
    processed: AtomicU64,
    dropped: AtomicU64,
}

impl LiveState {
    fn new(sink_capacity: usize) -> Self {
        Self {
            latest: ArcSwap::from_pointee(Metrics::default()),
            sinks: Mutex::new(Vec::new()),
            sink_capacity,
            running: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn processed(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Acquire)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::AcqRel);
    }

    fn publish(&self, metrics: Metrics) {
        let metrics = Arc::new(metrics);
        self.latest.store(Arc::clone(&metrics));

        let mut sinks = self.sinks.lock();
        sinks.retain(|sink| match sink.try_send(Arc::clone(&metrics)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!(block = metrics.block_index, "Subscriber full, snapshot skipped");
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("Pruned disconnected subscriber");
                false
            }
        });
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        // Dropping the senders disconnects every subscriber.
        self.sinks.lock().clear();
    }
}

/// Marks the analyzer stopped when the worker exits, including by panic.
struct StopOnExit(Arc<LiveState>);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!("Analysis thread panicked, live analysis stopped");
        }
        self.0.stop();
    }
}

type Worker = fn(AnalysisEngine, Receiver<Pending>, Receiver<Control>, Arc<LiveState>);

/// A block tagged with the reset generation it was submitted under.
struct Pending {
    generation: u64,
    block: AudioBlock,
}

enum Control {
    Reset,
    Shutdown,
}

enum Event {
    Block(Pending),
    Wake,
    Stop,
}

/// What happened to a submitted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Queued behind nothing.
    Queued,
    /// Queued after evicting an older pending block.
    Replaced,
}

/// Producer side of the live analysis thread.
///
/// Owns the thread; dropping it stops and joins the thread.
///
/// # Example
///
/// ```rust
/// use resonance::prelude::*;
///
/// let analyzer = AnalyzerBuilder::default().band_count(16).spawn()?;
/// let handle = analyzer.handle();
/// let updates = handle.subscribe();
///
/// analyzer.submit(AudioBlock {
///     time_left: vec![0.0; 1024],
///     time_right: vec![0.0; 1024],
///     freq_left: vec![-144.0; 512],
///     freq_right: vec![-144.0; 512],
///     sample_rate: 48000.0,
///     fft_size: 1024,
///     timestamp: 0.0,
/// })?;
///
/// let metrics = updates.recv().unwrap();
/// assert_eq!(metrics.loudness.momentary, -70.0);
/// analyzer.shutdown();
/// # Ok::<(), resonance::Error>(())
/// ```
pub struct LiveAnalyzer {
    blocks: Sender<Pending>,
    /// Producer-side receiver, used only to evict a stale pending block.
    evict: Receiver<Pending>,
    control: Sender<Control>,
    state: Arc<LiveState>,
    thread: Option<JoinHandle<()>>,
}

impl LiveAnalyzer {
    /// Move `engine` onto a new analysis thread.
    pub fn spawn(engine: AnalysisEngine) -> Result<Self> {
        Self::start(engine, analysis_thread)
    }

    fn start(engine: AnalysisEngine, worker: Worker) -> Result<Self> {
        let live = engine.config().live.clone();
        let (blocks, block_receiver) = bounded(live.queue_capacity);
        let (control, control_receiver) = bounded(CONTROL_CAPACITY);
        let state = Arc::new(LiveState::new(live.sink_capacity));

        let worker_state = Arc::clone(&state);
        let worker_blocks = block_receiver.clone();
        let thread = thread::Builder::new()
            .name(live.thread_name.clone())
            .spawn(move || {
                let _guard = StopOnExit(Arc::clone(&worker_state));
                worker(engine, worker_blocks, control_receiver, worker_state)
            })
            .map_err(Error::ThreadSpawn)?;

        tracing::debug!(thread = %live.thread_name, "Live analysis started");
        Ok(Self {
            blocks,
            evict: block_receiver,
            control,
            state,
            thread: Some(thread),
        })
    }

    /// Queue a block without blocking.
    ///
    /// Malformed blocks are rejected here. If a block is already pending it is
    /// dropped in favor of this one.
    pub fn submit(&self, block: AudioBlock) -> Result<SubmitOutcome> {
        if !self.is_running() {
            return Err(Error::Disconnected);
        }
        block.validate()?;

        let mut pending = Pending {
            generation: self.state.generation(),
            block,
        };
        let mut outcome = SubmitOutcome::Queued;
        loop {
            match self.blocks.try_send(pending) {
                Ok(()) => return Ok(outcome),
                Err(TrySendError::Full(returned)) => {
                    pending = returned;
                    if let Ok(stale) = self.evict.try_recv() {
                        self.state.record_drop();
                        outcome = SubmitOutcome::Replaced;
                        tracing::warn!(
                            timestamp = stale.block.timestamp,
                            "Analysis behind, dropped pending block"
                        );
                    }
                }
                Err(TrySendError::Disconnected(_)) => return Err(Error::Disconnected),
            }
        }
    }

    /// Clear all analysis state. Blocks submitted before this call are
    /// discarded; the next block submitted is analyzed from scratch.
    pub fn reset(&self) -> Result<()> {
        if !self.is_running() {
            return Err(Error::Disconnected);
        }
        self.state.generation.fetch_add(1, Ordering::AcqRel);
        while self.evict.try_recv().is_ok() {
            self.state.record_drop();
        }
        // A full control queue already holds a wake-up.
        let _ = self.control.try_send(Control::Reset);
        tracing::debug!(generation = self.state.generation(), "Live analysis reset requested");
        Ok(())
    }

    /// Cloneable read side for UI and consumer threads.
    pub fn handle(&self) -> AnalysisHandle {
        AnalysisHandle::new(Arc::clone(&self.state))
    }

    /// Most recent published snapshot.
    pub fn latest(&self) -> Arc<Metrics> {
        self.state.latest.load_full()
    }

    /// Whether the analysis thread is alive and accepting blocks.
    pub fn is_running(&self) -> bool {
        self.state.is_running() && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the thread and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.state.stop();
        let _ = self.control.try_send(Control::Shutdown);
        if thread.join().is_err() {
            tracing::error!("Analysis thread panicked");
        }
        tracing::debug!(
            processed = self.state.processed(),
            dropped = self.state.dropped(),
            "Live analysis stopped"
        );
    }
}

impl Drop for LiveAnalyzer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl core::fmt::Debug for LiveAnalyzer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LiveAnalyzer")
            .field("running", &self.state.is_running())
            .field("processed", &self.state.processed())
            .field("dropped", &self.state.dropped())
            .finish()
    }
}

fn analysis_thread(
    mut engine: AnalysisEngine,
    blocks: Receiver<Pending>,
    control: Receiver<Control>,
    state: Arc<LiveState>,
) {
    let mut generation = state.generation();

    while state.is_running() {
        let event = crossbeam_channel::select! {
            recv(control) -> message => match message {
                Ok(Control::Reset) => Event::Wake,
                Ok(Control::Shutdown) | Err(_) => Event::Stop,
            },
            recv(blocks) -> message => message.map_or(Event::Stop, Event::Block),
        };

        match event {
            Event::Stop => break,
            Event::Wake => sync_generation(&mut engine, &state, &mut generation),
            Event::Block(pending) => {
                sync_generation(&mut engine, &state, &mut generation);
                if pending.generation < generation {
                    state.record_drop();
                } else {
                    process_block(&mut engine, &state, generation, &pending.block);
                }
            }
        }
    }

    tracing::debug!("Analysis thread exiting");
}

fn process_block(
    engine: &mut AnalysisEngine,
    state: &LiveState,
    generation: u64,
    block: &AudioBlock,
) {
    match engine.process(block) {
        Ok(metrics) => {
            // A reset during processing makes this result stale.
            if state.generation() == generation {
                state.processed.fetch_add(1, Ordering::AcqRel);
                state.publish(metrics);
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "Analysis thread skipped block");
        }
    }
}

fn sync_generation(engine: &mut AnalysisEngine, state: &LiveState, generation: &mut u64) {
    let current = state.generation();
    if current != *generation {
        engine.reset();
        state.latest.store(Arc::new(Metrics::default()));
        *generation = current;
    }
}
