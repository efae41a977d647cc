//! Progress reporting for split runs.
//!
//! The pipeline hands byte and object counts to a caller-supplied callback;
//! how they are shown is up to the caller.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stage a [`ProgressEvent`] was emitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Periodic update while objects are being extracted
    Scanning,
    /// All sinks are closed
    Finished,
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressPhase::Scanning => f.write_str("scan"),
            ProgressPhase::Finished => f.write_str("done"),
        }
    }
}

/// Snapshot of a run's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,

    /// Input bytes consumed
    pub bytes: u64,

    /// Input size, when the input is a file
    pub total_bytes: Option<u64>,

    /// Objects extracted (scanning) or classified (finished)
    pub objects: u64,

    /// Number of category sinks, on the final event
    pub categories: Option<usize>,

    /// Time since the reporter was created
    pub elapsed: Duration,
}

impl ProgressEvent {
    /// Share of the input consumed, in `0.0..=1.0`.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} bytes", self.phase, self.bytes)?;
        if let Some(fraction) = self.fraction() {
            write!(f, " ({:.0}%)", fraction * 100.0)?;
        }
        match self.categories {
            Some(categories) => write!(f, ", {} objects across {} categories", self.objects, categories),
            None => write!(f, ", {} objects", self.objects),
        }
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Sends progress events to an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            started: Instant::now(),
        }
    }

    /// Reporter that emits nothing.
    pub fn noop() -> Self {
        Self {
            callback: None,
            started: Instant::now(),
        }
    }

    /// Periodic scan event.
    pub fn scan(&self, bytes: u64, total_bytes: Option<u64>, objects: u64) {
        self.emit(ProgressPhase::Scanning, bytes, total_bytes, objects, None);
    }

    /// Final event once every sink is closed.
    pub fn done(&self, bytes: u64, objects: u64, categories: usize) {
        self.emit(ProgressPhase::Finished, bytes, Some(bytes), objects, Some(categories));
    }

    fn emit(
        &self,
        phase: ProgressPhase,
        bytes: u64,
        total_bytes: Option<u64>,
        objects: u64,
        categories: Option<usize>,
    ) {
        let Some(callback) = &self.callback else {
            return;
        };

        let event = ProgressEvent {
            phase,
            bytes,
            total_bytes,
            objects,
            categories,
            elapsed: self.started.elapsed(),
        };
        tracing::trace!(%phase, bytes, objects, "progress");
        callback(event);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.callback.is_some())
            .finish()
    }
}
