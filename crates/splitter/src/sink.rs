//! Per-category output sinks.
//!
//! Each category owns one destination that receives a pretty-printed JSON
//! array written incrementally: `[` + newline on open, `,` + newline between
//! items, newline + `]` on finish. A failing sink is isolated: it records
//! its first error, drops later items for that category, and is reported
//! when the writer finishes.

use kbsplit_core::{AppError, AppResult, EmptyCategoryPolicy};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;

const ARRAY_OPEN: &[u8] = b"[\n";
const ITEM_SEPARATOR: &[u8] = b",\n";
const ARRAY_CLOSE: &[u8] = b"\n]";

/// File written next to the category files when a run did not finish.
pub const INCOMPLETE_MARKER: &str = "INCOMPLETE";

/// Opens one destination per category.
pub trait SinkTarget {
    type Writer: Write;

    /// Open (create or truncate) the destination for `category`.
    fn open(&mut self, category: &str) -> io::Result<Self::Writer>;

    /// Human-readable location of a category's destination.
    fn describe(&self, category: &str) -> String;

    /// Flag the destinations as the output of a run that stopped early.
    fn mark_incomplete(&mut self, _reason: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Writes `<dir>/<category>.json` files.
#[derive(Debug, Clone)]
pub struct DirectoryTarget {
    dir: PathBuf,
}

impl DirectoryTarget {
    /// Use `dir` as the output directory, creating it if needed.
    ///
    /// A marker left by an earlier incomplete run is removed.
    pub fn new(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            AppError::Config(format!("Failed to create output directory {:?}: {}", dir, e))
        })?;

        let target = Self { dir };
        match std::fs::remove_file(target.marker_path()) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                return Err(AppError::Config(format!(
                    "Failed to remove stale {:?}: {}",
                    target.marker_path(),
                    e
                )));
            }
            _ => {}
        }
        Ok(target)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(INCOMPLETE_MARKER)
    }

    pub fn path_for(&self, category: &str) -> PathBuf {
        self.dir.join(format!("{}.json", category))
    }
}

impl SinkTarget for DirectoryTarget {
    type Writer = BufWriter<File>;

    fn open(&mut self, category: &str) -> io::Result<Self::Writer> {
        File::create(self.path_for(category)).map(BufWriter::new)
    }

    fn describe(&self, category: &str) -> String {
        self.path_for(category).display().to_string()
    }

    fn mark_incomplete(&mut self, reason: &str) -> io::Result<()> {
        std::fs::write(self.marker_path(), format!("{}\n", reason))
    }
}

/// In-memory destinations keyed by category.
///
/// Clones share the same buffers, so a caller can hand one clone to the
/// splitter and read the output back through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    buffers: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
    incomplete: Rc<RefCell<Option<String>>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output written for `category`, if its destination was opened.
    pub fn contents(&self, category: &str) -> Option<String> {
        self.buffers
            .borrow()
            .get(category)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Categories whose destination was opened.
    pub fn categories(&self) -> Vec<String> {
        self.buffers.borrow().keys().cloned().collect()
    }

    /// Reason given when the run was flagged incomplete.
    pub fn incomplete(&self) -> Option<String> {
        self.incomplete.borrow().clone()
    }
}

impl SinkTarget for MemoryTarget {
    type Writer = MemoryWriter;

    fn open(&mut self, category: &str) -> io::Result<Self::Writer> {
        self.buffers
            .borrow_mut()
            .insert(category.to_string(), Vec::new());
        Ok(MemoryWriter {
            category: category.to_string(),
            buffers: Rc::clone(&self.buffers),
        })
    }

    fn describe(&self, category: &str) -> String {
        format!("memory:{}", category)
    }

    fn mark_incomplete(&mut self, reason: &str) -> io::Result<()> {
        *self.incomplete.borrow_mut() = Some(reason.to_string());
        Ok(())
    }
}

/// Writer handed out by [`MemoryTarget`].
#[derive(Debug)]
pub struct MemoryWriter {
    category: String,
    buffers: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffers
            .borrow_mut()
            .entry(self.category.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// State of one category's destination.
struct CategorySink<W> {
    category: String,
    writer: Option<W>,
    opened: bool,
    wrote_any: bool,
    written: u64,
    dropped: u64,
    failure: Option<io::Error>,
}

impl<W: Write> CategorySink<W> {
    fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            writer: None,
            opened: false,
            wrote_any: false,
            written: 0,
            dropped: 0,
            failure: None,
        }
    }

    fn fail(&mut self, err: io::Error, location: &str) {
        tracing::warn!("Sink '{}' ({}) failed: {}", self.category, location, err);
        self.writer = None;
        self.failure = Some(err);
    }
}

/// Final state of one category after [`SinkWriter::finish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkStatus {
    pub category: String,

    /// Destination location
    pub location: String,

    /// Items written successfully
    pub written: u64,

    /// Items lost because the sink had failed
    pub dropped: u64,

    /// Whether the destination was opened (and so exists)
    pub created: bool,

    /// First error seen, if the sink failed
    pub error: Option<String>,
}

/// Result of finishing every sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SinkOutcome {
    pub sinks: Vec<SinkStatus>,
}

impl SinkOutcome {
    pub fn failures(&self) -> impl Iterator<Item = &SinkStatus> {
        self.sinks.iter().filter(|s| s.error.is_some())
    }

    pub fn total_written(&self) -> u64 {
        self.sinks.iter().map(|s| s.written).sum()
    }

    pub fn total_dropped(&self) -> u64 {
        self.sinks.iter().map(|s| s.dropped).sum()
    }
}

/// Owns every category's destination for the duration of a run.
pub struct SinkWriter<T: SinkTarget> {
    target: T,
    sinks: Vec<CategorySink<T::Writer>>,
}

impl<T: SinkTarget> SinkWriter<T> {
    /// Prepare one sink per category.
    ///
    /// With [`EmptyCategoryPolicy::Write`] every destination is opened now;
    /// with [`EmptyCategoryPolicy::Skip`] a destination is opened when its
    /// first item arrives.
    pub fn open<S: AsRef<str>>(target: T, categories: &[S], policy: EmptyCategoryPolicy) -> Self {
        let sinks = categories
            .iter()
            .map(|c| CategorySink::new(c.as_ref()))
            .collect();

        let mut writer = Self { target, sinks };

        if policy == EmptyCategoryPolicy::Write {
            for index in 0..writer.sinks.len() {
                writer.ensure_open(index);
            }
        }

        writer
    }

    /// Append one classified document to `category`.
    ///
    /// I/O failures are contained in the sink; only an unknown category
    /// is an error.
    pub fn append(&mut self, category: &str, doc: &Map<String, Value>) -> AppResult<()> {
        let index = self
            .sinks
            .iter()
            .position(|s| s.category == category)
            .ok_or_else(|| AppError::Sink(format!("no sink for category '{}'", category)))?;

        if !self.ensure_open(index) {
            self.sinks[index].dropped += 1;
            return Ok(());
        }

        let sink = &mut self.sinks[index];
        let result = match sink.writer.as_mut() {
            Some(writer) => write_item(writer, !sink.wrote_any, doc),
            None => Ok(()),
        };

        match result {
            Ok(()) => {
                sink.wrote_any = true;
                sink.written += 1;
            }
            Err(err) => {
                sink.dropped += 1;
                let location = self.target.describe(&sink.category);
                sink.fail(err, &location);
            }
        }

        Ok(())
    }

    /// Flag the target's output as incomplete. Failure is logged only.
    pub fn mark_incomplete(&mut self, reason: &str) {
        if let Err(err) = self.target.mark_incomplete(reason) {
            tracing::warn!("Could not flag output as incomplete: {}", err);
        }
    }

    /// Items written so far to `category`.
    pub fn written(&self, category: &str) -> u64 {
        self.sinks
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.written)
            .unwrap_or(0)
    }

    /// Close every array and release the destinations.
    pub fn finish(mut self) -> SinkOutcome {
        let mut statuses = Vec::with_capacity(self.sinks.len());

        for sink in &mut self.sinks {
            let location = self.target.describe(&sink.category);

            if let Some(mut writer) = sink.writer.take() {
                let closed = writer
                    .write_all(ARRAY_CLOSE)
                    .and_then(|_| writer.flush());
                if let Err(err) = closed {
                    sink.fail(err, &location);
                }
            }

            statuses.push(SinkStatus {
                category: sink.category.clone(),
                location,
                written: sink.written,
                dropped: sink.dropped,
                created: sink.opened,
                error: sink.failure.as_ref().map(|e| e.to_string()),
            });
        }

        SinkOutcome { sinks: statuses }
    }

    /// Open the sink at `index` if needed; false when it has failed.
    fn ensure_open(&mut self, index: usize) -> bool {
        let sink = &mut self.sinks[index];
        if sink.failure.is_some() {
            return false;
        }
        if sink.writer.is_some() {
            return true;
        }

        let location = self.target.describe(&sink.category);
        let mut writer = match self.target.open(&sink.category) {
            Ok(writer) => writer,
            Err(err) => {
                sink.fail(err, &location);
                return false;
            }
        };
        sink.opened = true;

        if let Err(err) = writer.write_all(ARRAY_OPEN) {
            sink.fail(err, &location);
            return false;
        }

        tracing::debug!("Opened sink '{}' at {}", sink.category, location);
        sink.writer = Some(writer);
        true
    }
}

fn write_item<W: Write>(writer: &mut W, first: bool, doc: &Map<String, Value>) -> io::Result<()> {
    if !first {
        writer.write_all(ITEM_SEPARATOR)?;
    }
    serde_json::to_writer_pretty(&mut *writer, doc)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    /// Target whose writers fail once more than `limit` bytes are written.
    struct FailingTarget {
        failing: &'static str,
        limit: usize,
    }

    struct LimitedWriter {
        remaining: Option<usize>,
    }

    impl Write for LimitedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            match self.remaining.as_mut() {
                Some(left) if *left < buf.len() => Err(io::Error::new(io::ErrorKind::Other, "disk full")),
                Some(left) => {
                    *left -= buf.len();
                    Ok(buf.len())
                }
                None => Ok(buf.len()),
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SinkTarget for FailingTarget {
        type Writer = LimitedWriter;

        fn open(&mut self, category: &str) -> io::Result<LimitedWriter> {
            let remaining = (category == self.failing).then_some(self.limit);
            Ok(LimitedWriter { remaining })
        }

        fn describe(&self, category: &str) -> String {
            format!("failing:{}", category)
        }
    }

    /// Target that cannot create the destination for one category.
    struct ReadOnlyTarget {
        denied: &'static str,
        inner: MemoryTarget,
    }

    impl SinkTarget for ReadOnlyTarget {
        type Writer = MemoryWriter;

        fn open(&mut self, category: &str) -> io::Result<MemoryWriter> {
            if category == self.denied {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.inner.open(category)
        }

        fn describe(&self, category: &str) -> String {
            self.inner.describe(category)
        }
    }

    #[test]
    fn test_array_framing() {
        let target = MemoryTarget::new();
        let mut writer = SinkWriter::open(target.clone(), &["A", "B"], EmptyCategoryPolicy::Write);

        writer.append("A", &obj(json!({"content": "one"}))).unwrap();
        writer.append("A", &obj(json!({"content": "two"}))).unwrap();
        let outcome = writer.finish();

        assert_eq!(
            target.contents("A").unwrap(),
            "[\n{\n  \"content\": \"one\"\n},\n{\n  \"content\": \"two\"\n}\n]"
        );
        assert_eq!(target.contents("B").unwrap(), "[\n\n]");
        assert_eq!(outcome.total_written(), 2);
        assert!(outcome.sinks.iter().all(|s| s.created));
    }

    #[test]
    fn test_skip_policy_opens_lazily() {
        let target = MemoryTarget::new();
        let mut writer = SinkWriter::open(target.clone(), &["A", "B"], EmptyCategoryPolicy::Skip);
        assert!(target.categories().is_empty());

        writer.append("B", &obj(json!({"x": 1}))).unwrap();
        let outcome = writer.finish();

        assert_eq!(target.categories(), vec!["B".to_string()]);
        assert!(!outcome.sinks[0].created);
        assert!(outcome.sinks[1].created);
        let parsed: Value = serde_json::from_str(&target.contents("B").unwrap()).unwrap();
        assert_eq!(parsed, json!([{"x": 1}]));
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        let mut writer = SinkWriter::open(MemoryTarget::new(), &["A"], EmptyCategoryPolicy::Write);
        assert!(matches!(
            writer.append("Nope", &Map::new()),
            Err(AppError::Sink(_))
        ));
    }

    #[test]
    fn test_failing_sink_is_isolated() {
        let target = FailingTarget {
            failing: "Bad",
            limit: 8,
        };
        let mut writer = SinkWriter::open(target, &["Good", "Bad"], EmptyCategoryPolicy::Write);

        for i in 0..3 {
            writer.append("Bad", &obj(json!({"content": "some long text", "i": i}))).unwrap();
            writer.append("Good", &obj(json!({"i": i}))).unwrap();
        }
        assert_eq!(writer.written("Good"), 3);

        let outcome = writer.finish();
        let failures: Vec<_> = outcome.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].category, "Bad");
        assert_eq!(failures[0].written, 0);
        assert_eq!(failures[0].dropped, 3);
        assert!(failures[0].error.as_deref().unwrap().contains("disk full"));
        assert_eq!(outcome.total_written(), 3);
        assert_eq!(outcome.total_dropped(), 3);
    }

    #[test]
    fn test_failed_open_is_not_reported_as_created() {
        for policy in [EmptyCategoryPolicy::Skip, EmptyCategoryPolicy::Write] {
            let inner = MemoryTarget::new();
            let target = ReadOnlyTarget {
                denied: "Denied",
                inner: inner.clone(),
            };
            let mut writer = SinkWriter::open(target, &["Denied", "Fine"], policy);
            writer.append("Denied", &obj(json!({"x": 1}))).unwrap();
            writer.append("Fine", &obj(json!({"x": 2}))).unwrap();
            let outcome = writer.finish();

            let denied = &outcome.sinks[0];
            assert!(!denied.created, "{:?}", policy);
            assert_eq!(denied.dropped, 1);
            assert!(denied.error.as_deref().unwrap().contains("read-only"));
            assert!(outcome.sinks[1].created);
            assert_eq!(inner.categories(), vec!["Fine".to_string()]);
        }
    }

    #[test]
    fn test_directory_target_marks_and_clears_incomplete_runs() {
        let temp = TempDir::new().unwrap();
        let mut target = DirectoryTarget::new(temp.path()).unwrap();
        target.mark_incomplete("input ended at byte 9").unwrap();

        let marker = std::fs::read_to_string(target.marker_path()).unwrap();
        assert!(marker.contains("byte 9"));

        let fresh = DirectoryTarget::new(temp.path()).unwrap();
        assert!(!fresh.marker_path().exists());
    }

    #[test]
    fn test_directory_target_writes_files() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("nested").join("split");
        let target = DirectoryTarget::new(&out).unwrap();
        let expected_path = target.path_for("Cryptography");

        let mut writer = SinkWriter::open(target, &["Cryptography", "General"], EmptyCategoryPolicy::Write);
        writer
            .append("Cryptography", &obj(json!({"content": "cipher suites"})))
            .unwrap();
        let outcome = writer.finish();

        assert_eq!(outcome.sinks[0].location, expected_path.display().to_string());
        let text = std::fs::read_to_string(&expected_path).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!([{"content": "cipher suites"}]));
        assert_eq!(std::fs::read_to_string(out.join("General.json")).unwrap(), "[\n\n]");
    }
}
