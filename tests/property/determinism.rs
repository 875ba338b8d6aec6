//! Property-based tests for determinism guarantees

use permadeploy::manifest::{select_entry_point, ManifestEntry, PublishedManifest};
use permadeploy::tree::hasher;
use permadeploy::tree::path::normalize_logical_path;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn path_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.-]{1,8}".prop_filter("not a dot segment", |s| s != "." && s != "..")
}

fn messy_separator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("/"), Just("\\"), Just("//"), Just("\\\\"), Just("/\\")]
}

proptest! {
    #[test]
    fn test_content_hash_is_deterministic(content in any::<Vec<u8>>()) {
        let first = hasher::compute_content_hash(&content);
        let second = hasher::compute_content_hash(&content);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), 64);
        prop_assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_distinct_content_hashes_differ(a in any::<Vec<u8>>(), b in any::<Vec<u8>>()) {
        prop_assume!(a != b);
        prop_assert_ne!(hasher::compute_content_hash(&a), hasher::compute_content_hash(&b));
    }

    #[test]
    fn test_normalization_is_idempotent(raw in "[a-z./\\\\]{0,24}") {
        let once = normalize_logical_path(&raw);
        prop_assert_eq!(normalize_logical_path(&once), once);
    }

    #[test]
    fn test_separator_noise_normalizes_to_clean_path(
        segments in prop::collection::vec(path_segment(), 1..5),
        separators in prop::collection::vec(messy_separator(), 4),
        dot_prefix in any::<bool>(),
        trailing in any::<bool>(),
    ) {
        let clean = segments.join("/");
        let mut messy = if dot_prefix { "./".to_string() } else { String::new() };
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                messy.push_str(separators[i - 1]);
            }
            messy.push_str(segment);
        }
        if trailing {
            messy.push('/');
        }
        prop_assert_eq!(normalize_logical_path(&messy), clean);
    }

    #[test]
    fn test_entry_point_ignores_input_order(
        mut names in prop::collection::btree_set("[a-c]{1,3}\\.(html|css|js)", 1..8)
            .prop_map(|s| s.into_iter().collect::<Vec<_>>()),
        seed in any::<u64>(),
    ) {
        let sorted = select_entry_point(names.iter().map(String::as_str), "index.html");
        let rotate = (seed as usize) % names.len();
        names.rotate_left(rotate);
        names.reverse();
        let shuffled = select_entry_point(names.iter().map(String::as_str), "index.html");
        prop_assert_eq!(sorted, shuffled);
    }

    #[test]
    fn test_manifest_serialization_is_stable(
        ids in prop::collection::btree_map("[a-z]{1,6}\\.html", "[A-Za-z0-9]{43}", 1..6)
    ) {
        let entries: BTreeMap<String, ManifestEntry> = ids
            .into_iter()
            .map(|(path, id)| {
                (path, ManifestEntry {
                    content_hash: hasher::compute_content_hash(id.as_bytes()),
                    content_id: id,
                    size_bytes: 1,
                    last_modified: None,
                })
            })
            .collect();
        let first = PublishedManifest::from_entries(&entries, "index.html").unwrap();
        let second = PublishedManifest::from_entries(&entries.clone(), "index.html").unwrap();
        prop_assert_eq!(first.to_bytes().unwrap(), second.to_bytes().unwrap());
    }
}
