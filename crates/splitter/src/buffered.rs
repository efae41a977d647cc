//! Whole-document reference splitter.
//!
//! Parses the entire input at once and groups classified documents in
//! memory. Only suitable for small inputs; the streaming pipeline must
//! produce the same grouping.

use kbsplit_core::AppResult;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::classifier::Classifier;
use crate::rules::RuleTable;

/// Classify every object element of a JSON array held in memory.
///
/// Categories with no documents are absent from the result. Elements that
/// are not objects are ignored, as the streaming scanner never yields them.
pub fn split_buffered(input: &[u8], table: &RuleTable) -> AppResult<BTreeMap<String, Vec<Value>>> {
    let items: Vec<Value> = serde_json::from_slice(input)?;
    let classifier = Classifier::new(table);
    let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();

    for item in items {
        if let Value::Object(mut doc) = item {
            let category = classifier.classify(&mut doc);
            groups
                .entry(category.to_string())
                .or_default()
                .push(Value::Object(doc));
        }
    }

    tracing::debug!("Buffered split produced {} non-empty categories", groups.len());
    Ok(groups)
}
