//! Classification of two element sets into typed diff records

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::diff::{DiffRecord, DiffType};
use crate::element::Element;

/// Compares two path-ordered element sets and classifies every differing
/// path into exactly one of the five diff types.
///
/// Both inputs must be in the scanner's traversal order, which orders
/// elements by relative path; the comparator merges them so that records
/// come out in the interleaved path order of the union. Identical paths
/// produce no record.
pub struct Comparator {
    fast_mode: bool,
}

impl Comparator {
    /// `fast_mode` trusts timestamps only: files with equal timestamps are
    /// considered identical without consulting content hashes.
    pub fn new(fast_mode: bool) -> Self {
        Self { fast_mode }
    }

    /// Produce one diff record per differing path in the union of both sets
    pub fn compare(&self, source: &[Element], destination: &[Element]) -> Vec<DiffRecord> {
        let mut records = Vec::new();

        let mut source_iter = source.iter().peekable();
        let mut destination_iter = destination.iter().peekable();

        loop {
            let record = match (source_iter.peek(), destination_iter.peek()) {
                (Some(s), Some(d)) => match s.relative_path.cmp(&d.relative_path) {
                    Ordering::Less => Self::only_in_source(source_iter.next()),
                    Ordering::Greater => Self::only_in_destination(destination_iter.next()),
                    Ordering::Equal => {
                        let (s, d) = (source_iter.next(), destination_iter.next());
                        match (s, d) {
                            (Some(s), Some(d)) => self.classify_pair(s, d),
                            _ => None,
                        }
                    }
                },
                (Some(_), None) => Self::only_in_source(source_iter.next()),
                (None, Some(_)) => Self::only_in_destination(destination_iter.next()),
                (None, None) => break,
            };

            if let Some(record) = record {
                debug!(
                    "{} {}: {:?}",
                    record.diff_type.symbol(),
                    record.kind.symbol(),
                    record.source
                );
                records.push(record);
            }
        }

        info!(
            "compared {} source and {} destination elements: {} differences",
            source.len(),
            destination.len(),
            records.len()
        );

        records
    }

    fn only_in_source(element: Option<&Element>) -> Option<DiffRecord> {
        element.map(|e| {
            DiffRecord::new(
                DiffType::Positive,
                e.kind,
                e.relative_path.clone(),
                e.relative_path.clone(),
            )
        })
    }

    fn only_in_destination(element: Option<&Element>) -> Option<DiffRecord> {
        element.map(|e| {
            DiffRecord::new(
                DiffType::Negative,
                e.kind,
                e.relative_path.clone(),
                e.relative_path.clone(),
            )
        })
    }

    /// Classify a path present on both sides; None means identical
    fn classify_pair(&self, source: &Element, destination: &Element) -> Option<DiffRecord> {
        let record = |diff_type| {
            Some(DiffRecord::new(
                diff_type,
                source.kind,
                source.relative_path.clone(),
                destination.relative_path.clone(),
            ))
        };

        // A kind mismatch at the same path cannot be reconciled automatically
        if source.kind != destination.kind {
            return record(DiffType::Unknown);
        }

        // Directories are identical by existence; only files carry content
        if source.is_dir() {
            return None;
        }

        match source.modified.tolerant_cmp(&destination.modified) {
            Ordering::Greater => record(DiffType::Newer),
            Ordering::Less => record(DiffType::Older),
            Ordering::Equal => {
                if self.fast_mode {
                    return None;
                }

                match (&source.hash, &destination.hash) {
                    (Some(s), Some(d)) if s != d => record(DiffType::Unknown),
                    _ => None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;
    use crate::timestamp::ModTime;
    use std::path::PathBuf;

    fn file(path: &str, secs: u64, nanos: u32, hash: Option<&str>) -> Element {
        Element {
            relative_path: PathBuf::from(path),
            kind: ElementKind::File,
            modified: ModTime::new(secs, nanos),
            hash: hash.map(str::to_string),
        }
    }

    fn directory(path: &str) -> Element {
        Element {
            relative_path: PathBuf::from(path),
            kind: ElementKind::Directory,
            modified: ModTime::new(0, 0),
            hash: None,
        }
    }

    #[test]
    fn source_only_is_positive() {
        let records = Comparator::new(false).compare(&[file("new.txt", 10, 0, None)], &[]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].diff_type, DiffType::Positive);
        assert_eq!(records[0].destination, PathBuf::from("new.txt"));
    }

    #[test]
    fn destination_only_is_negative() {
        let records = Comparator::new(false).compare(&[], &[directory("old")]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].diff_type, DiffType::Negative);
        assert_eq!(records[0].kind, ElementKind::Directory);
    }

    #[test]
    fn newer_and_older_follow_the_tolerant_rule() {
        let records = Comparator::new(false).compare(
            &[file("a.txt", 20, 0, None), file("b.txt", 10, 0, None)],
            &[file("a.txt", 10, 0, None), file("b.txt", 20, 0, None)],
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].diff_type, DiffType::Newer);
        assert_eq!(records[1].diff_type, DiffType::Older);
    }

    #[test]
    fn precision_mismatch_does_not_produce_a_record() {
        // 12.123456 vs 12.12: equal after truncation to two digits
        let records = Comparator::new(true).compare(
            &[file("same.txt", 12, 123_456_000, None)],
            &[file("same.txt", 12, 120_000_000, None)],
        );

        assert!(records.is_empty());
    }

    #[test]
    fn equal_timestamps_different_content_is_unknown_in_hash_mode() {
        let source = [file("f.txt", 10, 0, Some("aaa"))];
        let destination = [file("f.txt", 10, 0, Some("bbb"))];

        let records = Comparator::new(false).compare(&source, &destination);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].diff_type, DiffType::Unknown);

        // fast mode trusts the timestamps and reports nothing
        let records = Comparator::new(true).compare(&source, &destination);
        assert!(records.is_empty());
    }

    #[test]
    fn matching_directories_are_identical_by_existence() {
        let records = Comparator::new(false).compare(&[directory("d")], &[directory("d")]);
        assert!(records.is_empty());
    }

    #[test]
    fn kind_mismatch_is_unknown() {
        let records =
            Comparator::new(false).compare(&[directory("thing")], &[file("thing", 10, 0, None)]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].diff_type, DiffType::Unknown);
        assert_eq!(records[0].kind, ElementKind::Directory);
    }

    #[test]
    fn union_order_is_preserved() {
        // a.txt only in source, b.txt only in destination, c.txt differs
        let records = Comparator::new(true).compare(
            &[file("a.txt", 10, 0, None), file("c.txt", 10, 0, None)],
            &[file("b.txt", 10, 0, None), file("c.txt", 20, 0, None)],
        );

        let summary: Vec<_> = records
            .iter()
            .map(|r| (r.diff_type, r.source.clone()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (DiffType::Positive, PathBuf::from("a.txt")),
                (DiffType::Negative, PathBuf::from("b.txt")),
                (DiffType::Older, PathBuf::from("c.txt")),
            ]
        );
    }

    #[test]
    fn identical_trees_produce_no_records() {
        let tree = [
            directory("d"),
            file("d/f.txt", 10, 500_000_000, Some("same")),
        ];

        let records = Comparator::new(false).compare(&tree, &tree);
        assert!(records.is_empty());
    }
}
