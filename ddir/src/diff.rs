//! Diff records: one classified difference between two trees

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::element::ElementKind;

/// Type of a single diff.
///
/// - positive: element present in the source only
/// - negative: element present in the destination only
/// - newer: source element newer than the destination element
/// - older: destination element newer than the source element
/// - unknown: cannot be categorized automatically, requires a human decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffType {
    Positive,
    Negative,
    Newer,
    Older,
    Unknown,
}

impl DiffType {
    /// All types in mode-policy order
    pub const ALL: [DiffType; 5] = [
        Self::Positive,
        Self::Negative,
        Self::Newer,
        Self::Older,
        Self::Unknown,
    ];

    /// Wire symbol used in the diff file format
    pub fn symbol(&self) -> char {
        match self {
            Self::Positive => '+',
            Self::Negative => '-',
            Self::Newer => '>',
            Self::Older => '<',
            Self::Unknown => '?',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Self::Positive),
            '-' => Some(Self::Negative),
            '>' => Some(Self::Newer),
            '<' => Some(Self::Older),
            '?' => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Position of this type within a mode policy (`+ - > < ?`)
    pub fn index(&self) -> usize {
        match self {
            Self::Positive => 0,
            Self::Negative => 1,
            Self::Newer => 2,
            Self::Older => 3,
            Self::Unknown => 4,
        }
    }

    /// What applying a diff of this type does
    pub fn description(&self) -> &'static str {
        match self {
            Self::Positive => "copy the source element to the destination",
            Self::Negative => "delete the destination element",
            Self::Newer => "overwrite the destination element with the source",
            Self::Older => "overwrite the source element with the destination",
            Self::Unknown => "overwrite the destination element with the source",
        }
    }
}

impl fmt::Display for DiffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Newer => "newer",
            Self::Older => "older",
            Self::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// One classified difference between a source-side and a destination-side
/// element (either side may be absent).
///
/// Paths are relative to the respective tree roots. For `positive` the
/// destination path is the would-be target location; for `negative` the
/// source path is the would-be location. Records are immutable once produced
/// and keep their comparison-traversal order through the codec round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub diff_type: DiffType,
    pub kind: ElementKind,
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl DiffRecord {
    pub fn new(
        diff_type: DiffType,
        kind: ElementKind,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            diff_type,
            kind,
            source: source.into(),
            destination: destination.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip() {
        for diff_type in DiffType::ALL {
            assert_eq!(DiffType::from_symbol(diff_type.symbol()), Some(diff_type));
        }
        assert_eq!(DiffType::from_symbol('!'), None);
    }

    #[test]
    fn indices_follow_policy_order() {
        let indices: Vec<_> = DiffType::ALL.iter().map(|t| t.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }
}
