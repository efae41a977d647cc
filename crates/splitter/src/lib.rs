//! Streaming knowledge-base splitter.
//!
//! Reads a large JSON array of documents in fixed-size chunks, extracts
//! each top-level object as soon as it is complete, classifies it by
//! keyword rules, and appends it to one JSON array file per category.
//! Memory use is bounded by the chunk size plus the largest single object.

pub mod buffered;
pub mod classifier;
pub mod progress;
pub mod rules;
pub mod scanner;
pub mod sink;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use buffered::split_buffered;
pub use classifier::{Classifier, Match};
pub use progress::{ProgressEvent, ProgressPhase, ProgressReporter};
pub use rules::{CategoryRule, RuleTable, FALLBACK_CATEGORY};
pub use scanner::{ObjectScanner, RawObject, ScanError};
pub use sink::{
    DirectoryTarget, MemoryTarget, SinkOutcome, SinkTarget, SinkWriter, INCOMPLETE_MARKER,
};
pub use types::{CategoryCount, SinkFailure, SplitOptions, SplitReport};

use chrono::Utc;
use kbsplit_core::{AppError, AppResult};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Running totals for one pass over the input.
#[derive(Debug, Default)]
struct Tally {
    bytes_read: u64,
    extracted: u64,
    parsed: u64,
    skipped: u64,
    cancelled: bool,
}

/// Split an input file into `<output_dir>/<category>.json` files.
pub fn split_file(
    input: &Path,
    output_dir: &Path,
    table: &RuleTable,
    options: &SplitOptions,
    progress: &ProgressReporter,
    cancel: &AtomicBool,
) -> AppResult<SplitReport> {
    tracing::info!("Splitting {:?} into {:?}", input, output_dir);

    let file = File::open(input)
        .map_err(|e| AppError::Config(format!("Failed to open input {:?}: {}", input, e)))?;
    let total_bytes = file.metadata().map(|m| m.len()).ok();
    let target = DirectoryTarget::new(output_dir)?;

    let mut report = run(file, total_bytes, target, table, options, progress, cancel)?;
    report.input = Some(input.display().to_string());
    Ok(report)
}

/// Split any byte stream into the destinations of `target`.
///
/// Sinks are always finalised, even when the input turns out to be
/// malformed or the run is cancelled, so every written file is a valid
/// JSON array. Such a run still returns its report, with
/// `structural_error` or `cancelled` set, and the target is flagged
/// incomplete; [`SplitReport::check`] turns it into an error. Only read
/// failures return `Err`.
pub fn split_reader<R: Read, T: SinkTarget>(
    reader: R,
    target: T,
    table: &RuleTable,
    options: &SplitOptions,
    progress: &ProgressReporter,
    cancel: &AtomicBool,
) -> AppResult<SplitReport> {
    run(reader, None, target, table, options, progress, cancel)
}

fn run<R: Read, T: SinkTarget>(
    mut reader: R,
    total_bytes: Option<u64>,
    target: T,
    table: &RuleTable,
    options: &SplitOptions,
    progress: &ProgressReporter,
    cancel: &AtomicBool,
) -> AppResult<SplitReport> {
    let start = Instant::now();
    let started_at = Utc::now();

    let classifier = Classifier::new(table);
    let mut sinks = SinkWriter::open(target, &table.category_names(), options.empty_categories);
    let mut tally = Tally::default();

    let driven = drive(
        &mut reader,
        total_bytes,
        &classifier,
        &mut sinks,
        &mut tally,
        options,
        progress,
        cancel,
    );

    let (scan_error, fatal) = match driven {
        Ok(()) => (None, None),
        Err(AppError::Structural(msg)) => (Some(msg), None),
        Err(err) => (None, Some(err)),
    };

    let incomplete = match (&scan_error, &fatal) {
        (Some(msg), _) => Some(format!("malformed input: {}", msg)),
        (None, Some(err)) => Some(format!("aborted: {}", err)),
        (None, None) if tally.cancelled => Some(format!("cancelled after {} bytes", tally.bytes_read)),
        (None, None) => None,
    };
    if let Some(reason) = &incomplete {
        sinks.mark_incomplete(reason);
    }

    let outcome = sinks.finish();
    progress.done(tally.bytes_read, tally.parsed, outcome.sinks.len());

    let report = SplitReport {
        started_at,
        input: None,
        bytes_read: tally.bytes_read,
        objects_extracted: tally.extracted,
        objects_parsed: tally.parsed,
        objects_skipped: tally.skipped,
        categories: outcome
            .sinks
            .iter()
            .map(|s| CategoryCount {
                category: s.category.clone(),
                count: s.written,
                dropped: s.dropped,
                created: s.created,
                location: s.location.clone(),
            })
            .collect(),
        sink_failures: outcome
            .failures()
            .map(|s| SinkFailure {
                category: s.category.clone(),
                location: s.location.clone(),
                error: s.error.clone().unwrap_or_default(),
            })
            .collect(),
        cancelled: tally.cancelled,
        structural_error: scan_error,
        duration_secs: start.elapsed().as_secs_f64(),
    };

    if let Some(err) = fatal {
        tracing::error!(
            "Split aborted after {} bytes ({} objects written): {}",
            report.bytes_read,
            report.total_written(),
            err
        );
        return Err(err);
    }

    log_summary(&report);
    Ok(report)
}

/// Read, scan, parse, classify and write until end of input or cancellation.
#[allow(clippy::too_many_arguments)]
fn drive<R: Read, T: SinkTarget>(
    reader: &mut R,
    total_bytes: Option<u64>,
    classifier: &Classifier<'_>,
    sinks: &mut SinkWriter<T>,
    tally: &mut Tally,
    options: &SplitOptions,
    progress: &ProgressReporter,
    cancel: &AtomicBool,
) -> AppResult<()> {
    let mut scanner = ObjectScanner::new();
    let mut chunk = vec![0u8; options.chunk_size.max(1)];

    loop {
        if cancel.load(Ordering::Relaxed) {
            tracing::warn!(
                "Cancelled after {} bytes; discarding {} bytes of a partial object",
                tally.bytes_read,
                scanner.pending_bytes()
            );
            tally.cancelled = true;
            return Ok(());
        }

        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(AppError::Io(e)),
        };
        tally.bytes_read += read as u64;

        for raw in scanner.consume(&chunk[..read])? {
            tally.extracted += 1;
            route(raw, classifier, sinks, tally)?;

            if options.progress_interval > 0 && tally.extracted % options.progress_interval == 0 {
                progress.scan(tally.bytes_read, total_bytes, tally.extracted);
            }
        }

        if let Some(err) = scanner.error() {
            return Err(err.clone().into());
        }
    }

    let summary = scanner.finish()?;
    tracing::debug!(
        "Scan complete: {} bytes, {} objects",
        summary.bytes,
        summary.objects
    );
    Ok(())
}

/// Parse one raw object and hand it to its category's sink.
fn route<T: SinkTarget>(
    raw: RawObject,
    classifier: &Classifier<'_>,
    sinks: &mut SinkWriter<T>,
    tally: &mut Tally,
) -> AppResult<()> {
    let mut doc: Map<String, Value> = match serde_json::from_slice(&raw.bytes) {
        Ok(doc) => doc,
        Err(e) => {
            tally.skipped += 1;
            let err = AppError::Parse(format!("object at byte {}: {}", raw.offset, e));
            tracing::warn!("Skipping object: {}", err);
            tracing::trace!("Unparsable object text: {}", raw.text_lossy());
            return Ok(());
        }
    };

    tally.parsed += 1;
    let category = classifier.classify(&mut doc);
    tracing::debug!("Object at byte {} -> {}", raw.offset, category);

    sinks.append(category, &doc)
}

fn log_summary(report: &SplitReport) {
    for count in &report.categories {
        if count.dropped > 0 {
            tracing::info!(
                "{}: {} written, {} dropped ({})",
                count.category,
                count.count,
                count.dropped,
                count.location
            );
        } else {
            tracing::info!("{}: {} written ({})", count.category, count.count, count.location);
        }
    }

    for failure in &report.sink_failures {
        tracing::warn!(
            "Sink '{}' failed at {}: {}",
            failure.category,
            failure.location,
            failure.error
        );
    }

    if let Some(err) = &report.structural_error {
        tracing::error!("Input is malformed, output holds only the objects before it: {}", err);
    }

    tracing::info!(
        "Split completed: {} objects extracted, {} classified, {} skipped, {} bytes in {:.2}s{}",
        report.objects_extracted,
        report.objects_parsed,
        report.objects_skipped,
        report.bytes_read,
        report.duration_secs,
        if report.cancelled { " (cancelled)" } else { "" }
    );
}
