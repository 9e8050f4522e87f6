//! Typed representation of one filesystem entry

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::timestamp::ModTime;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    File,
    Directory,
}

impl ElementKind {
    /// Wire symbol used in the diff file format
    pub fn symbol(&self) -> char {
        match self {
            Self::File => 'f',
            Self::Directory => 'd',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'f' => Some(Self::File),
            'd' => Some(Self::Directory),
            _ => None,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// One filesystem entry within a scanned tree.
///
/// The kind is determined once at scan time and not re-evaluated. Symbolic
/// links are never followed and appear as file-kind elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    /// Path relative to the traversal root; unique within one scan
    pub relative_path: PathBuf,
    pub kind: ElementKind,
    /// Raw modification time as captured at scan time
    pub modified: ModTime,
    /// Content digest; present only for files when hashing is enabled
    pub hash: Option<String>,
}

impl Element {
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}
