//! Cross-module tests for the streaming pipeline.

mod streaming;

use crate::sink::MemoryTarget;
use crate::{split_reader, ProgressReporter, RuleTable, SplitOptions, SplitReport};
use kbsplit_core::{AppResult, EmptyCategoryPolicy};
use serde_json::Value;
use std::sync::atomic::AtomicBool;

/// Run the pipeline over `input` into memory.
fn split_in_memory(
    input: &[u8],
    chunk_size: usize,
    policy: EmptyCategoryPolicy,
) -> (AppResult<SplitReport>, MemoryTarget) {
    let target = MemoryTarget::new();
    let options = SplitOptions {
        chunk_size,
        empty_categories: policy,
        progress_interval: 0,
    };
    let cancel = AtomicBool::new(false);
    let result = split_reader(
        input,
        target.clone(),
        &RuleTable::builtin(),
        &options,
        &ProgressReporter::noop(),
        &cancel,
    );
    (result, target)
}

/// Parse a category's output as a JSON array.
fn parsed(target: &MemoryTarget, category: &str) -> Vec<Value> {
    let text = target
        .contents(category)
        .unwrap_or_else(|| panic!("no output for {}", category));
    match serde_json::from_str(&text) {
        Ok(Value::Array(items)) => items,
        other => panic!("{} is not a JSON array: {:?}", category, other),
    }
}
