use log::{error, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::analysis::threshold::{compress_with, mask_stats, CompressOptions, MaskStats};
use crate::buffer::{PixelBuffer, Threshold};
use crate::error::{AppError, AppResult};
use crate::taskstatus::{MonotonicSink, ProgressSink};

/// Holds the most recently computed result. Written whole by the worker at
/// the end of a run, read by save and display paths.
#[derive(Clone, Default)]
pub struct CompressedSlot(Arc<Mutex<Option<Arc<PixelBuffer>>>>);

impl CompressedSlot {
    pub fn latest(&self) -> Option<Arc<PixelBuffer>> {
        match self.0.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn publish(&self, buffer: Arc<PixelBuffer>) {
        let mut slot = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(buffer);
    }
}

/// Clears the busy flag when the worker exits, including by panic
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// What a finished run hands back to the caller
#[derive(Clone)]
pub struct CompressionOutcome {
    pub buffer: Arc<PixelBuffer>,
    pub threshold: Threshold,
    pub stats: MaskStats,
    pub elapsed: Duration,
}

pub type CompressionResult = AppResult<CompressionOutcome>;

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_owned()
    }
}

/// Runs threshold masking on a background thread, one run at a time
#[derive(Default)]
pub struct Compressor {
    busy: Arc<AtomicBool>,
    slot: CompressedSlot,
    handle: Option<JoinHandle<()>>,
}

impl Compressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn latest(&self) -> Option<Arc<PixelBuffer>> {
        self.slot.latest()
    }

    /// Spawns the worker. Rejected with `Busy` while a previous run is
    /// still going. `on_progress` and `on_done` are called on the worker
    /// thread.
    pub fn start<S, D>(
        &mut self,
        original: Arc<PixelBuffer>,
        threshold: Threshold,
        options: CompressOptions,
        on_progress: S,
        on_done: D,
    ) -> AppResult<()>
    where
        S: ProgressSink + Send + 'static,
        D: FnOnce(CompressionResult) + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Compression requested while a previous run is active");
            return Err(AppError::Busy);
        }

        // The previous worker has released the flag, so this join is immediate
        if let Some(previous) = self.handle.take() {
            let _ = previous.join();
        }

        let guard = BusyGuard(self.busy.clone());
        let slot = self.slot.clone();

        let spawned = thread::Builder::new()
            .name("compress-worker".to_owned())
            .spawn(move || {
                let result = run_compression(&original, threshold, options, on_progress, &slot);
                // Idle again before anyone hears about the result
                drop(guard);
                on_done(result);
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(why) => {
                // The closure, and the guard inside it, was dropped by the failed spawn
                error!("Failed to spawn compression worker: {}", why);
                Err(AppError::ProcessingError(why.to_string()))
            }
        }
    }

    /// Blocks until the current worker, if any, has finished
    pub fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Compression worker terminated abnormally");
            }
        }
    }
}

fn run_compression<S: ProgressSink>(
    original: &PixelBuffer,
    threshold: Threshold,
    options: CompressOptions,
    on_progress: S,
    slot: &CompressedSlot,
) -> CompressionResult {
    info!(
        "Compression started: {}x{} at threshold {}",
        original.width(),
        original.height(),
        threshold
    );
    let start = Instant::now();
    let sink = MonotonicSink::new(on_progress);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        compress_with(original, threshold, options, sink)
    }));

    let compressed = match outcome {
        Ok(Ok(compressed)) => compressed,
        Ok(Err(why)) => {
            error!("Compression rejected input: {}", why);
            return Err(why.into());
        }
        Err(payload) => {
            let message = panic_message(payload);
            error!("Compression failed: {}", message);
            return Err(AppError::ProcessingError(message));
        }
    };

    let stats = mask_stats(original, &compressed);
    let buffer = Arc::new(compressed);
    slot.publish(buffer.clone());

    let elapsed = start.elapsed();
    info!(
        "Compression completed in {:?}: {} of {} channel values zeroed",
        elapsed, stats.zeroed_channels, stats.total_channels
    );

    Ok(CompressionOutcome {
        buffer,
        threshold,
        stats,
        elapsed,
    })
}
