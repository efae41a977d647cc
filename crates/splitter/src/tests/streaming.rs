//! Chunk-boundary robustness and equivalence with the buffered splitter.

use super::{parsed, split_in_memory};
use crate::{split_buffered, RuleTable};
use kbsplit_core::EmptyCategoryPolicy;
use serde_json::{json, Value};

/// Documents whose serialized form puts escapes, braces and multi-byte
/// characters in awkward places.
fn tricky_corpus() -> Vec<u8> {
    let docs = vec![
        json!({"content": "Malware \"packer\" with {braces} and \\backslashes\\"}),
        json!({"content": "TLS handshake: {\"nested\": \"json-looking\"}", "metadata": {"depth": {"a": {"b": 1}}}}),
        json!({"content": "Kubernetes ☸ cluster — ユーザー", "metadata": null}),
        json!({"content": "trailing backslash \\", "metadata": {"category": "old"}}),
        json!({"content": "}}}} closing braces first {{{{"}),
        json!({"title": "no content field"}),
        json!({"content": "session cookie theft", "arr": [{"x": "}"}, {"y": "\""}]}),
        json!({"content": "AWS IAM policy review"}),
        json!({"content": "plain words only"}),
    ];
    serde_json::to_vec_pretty(&docs).unwrap()
}

#[test]
fn test_any_chunk_size_gives_identical_output() {
    let input = tricky_corpus();
    let (reference, reference_target) = split_in_memory(&input, input.len(), EmptyCategoryPolicy::Write);
    let reference = reference.unwrap();
    assert_eq!(reference.objects_parsed, 9);

    let categories = RuleTable::builtin();
    let categories = categories.category_names();

    for size in (1..64).chain([97, 256, 1024]) {
        let (result, target) = split_in_memory(&input, size, EmptyCategoryPolicy::Write);
        let report = result.unwrap();
        assert_eq!(report.objects_parsed, reference.objects_parsed, "chunk size {}", size);

        for category in &categories {
            assert_eq!(
                target.contents(category),
                reference_target.contents(category),
                "category {} differs at chunk size {}",
                category,
                size
            );
        }
    }
}

#[test]
fn test_streaming_matches_buffered_reference() {
    let input = tricky_corpus();
    let table = RuleTable::builtin();
    let expected = split_buffered(&input, &table).unwrap();

    let (result, target) = split_in_memory(&input, 5, EmptyCategoryPolicy::Skip);
    let report = result.unwrap();

    let produced: Vec<String> = target.categories();
    let expected_keys: Vec<String> = expected.keys().cloned().collect();
    assert_eq!(produced, expected_keys);

    for (category, items) in &expected {
        assert_eq!(&parsed(&target, category), items, "category {}", category);
        assert_eq!(report.count_for(category), items.len() as u64);
    }
}

#[test]
fn test_every_output_element_carries_its_category() {
    let input = tricky_corpus();
    let (result, target) = split_in_memory(&input, 13, EmptyCategoryPolicy::Write);
    let report = result.unwrap();

    let mut total = 0;
    for count in &report.categories {
        let items = parsed(&target, &count.category);
        assert_eq!(items.len() as u64, count.count);
        for item in &items {
            assert_eq!(item["metadata"]["category"], Value::String(count.category.clone()));
        }
        total += items.len() as u64;
    }
    assert_eq!(total, report.objects_parsed);
}

#[test]
fn test_expected_routing_of_corpus() {
    let input = tricky_corpus();
    let (result, _target) = split_in_memory(&input, 64, EmptyCategoryPolicy::Write);
    let report = result.unwrap();

    assert_eq!(report.count_for("Malware_Analysis"), 1);
    assert_eq!(report.count_for("Network_Security"), 1);
    assert_eq!(report.count_for("Cloud_Security"), 2);
    assert_eq!(report.count_for("Web_Security"), 1);
    assert_eq!(report.count_for("General"), 4);
}
