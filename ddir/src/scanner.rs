//! Directory tree traversal producing ordered element sets

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::element::{Element, ElementKind};
use crate::error::{DdirError, Result};
use crate::filter::IgnoreFilter;
use crate::target::METADATA_DIR;
use crate::timestamp::ModTime;

/// Options for directory scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Collect content hashes for files (disabled in fast mode)
    pub collect_hashes: bool,
    /// Hash algorithm to use when collect_hashes is true
    pub hash_algorithm: HashAlgorithm,
    /// Glob patterns pruned from traversal, relative to the root
    pub ignore: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            collect_hashes: true,
            hash_algorithm: HashAlgorithm::Blake3,
            ignore: Vec::new(),
        }
    }
}

/// Hash algorithms supported for file scanning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256 hash
    Sha256,
    /// Blake3 hash (faster)
    Blake3,
}

/// A non-fatal problem encountered while scanning a sub-entry
#[derive(Debug, Clone)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub message: String,
}

/// Result of scanning one tree: elements in stable traversal order plus the
/// accumulated per-entry issues. Entries with issues are excluded from the
/// element set.
#[derive(Debug)]
pub struct ScanOutcome {
    pub elements: Vec<Element>,
    pub issues: Vec<ScanIssue>,
}

/// Recursive directory scanner built on walkdir.
///
/// Symbolic links are never followed; a link is recorded as an opaque
/// file-kind element, which keeps traversal cycle-free. Entries are visited
/// in a deterministic order sorted by file name, directories before their
/// contents, so two scans of the same tree always agree.
pub struct TreeScanner {
    options: ScanOptions,
    filter: IgnoreFilter,
}

impl TreeScanner {
    pub fn new(options: ScanOptions) -> Result<Self> {
        let filter = IgnoreFilter::new(&options.ignore)?;
        Ok(Self { options, filter })
    }

    /// Scan a directory tree and return its elements.
    ///
    /// A missing or unreadable root is a fatal error; problems with
    /// sub-entries are collected as issues and do not abort the scan.
    pub async fn scan(&self, root: &Path) -> Result<ScanOutcome> {
        if !root.exists() {
            return Err(DdirError::scan_error(root, "directory does not exist"));
        }

        if !root.is_dir() {
            return Err(DdirError::scan_error(root, "path is not a directory"));
        }

        let mut elements = Vec::new();
        let mut issues = Vec::new();

        let walk = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                if relative.as_os_str().is_empty() {
                    return true;
                }
                relative != Path::new(METADATA_DIR) && !self.filter.is_ignored(relative)
            });

        for result in walk {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    warn!("skipping unreadable entry {:?}: {}", path, e);
                    issues.push(ScanIssue {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }

            match self.create_element(&entry, root).await {
                Ok(element) => elements.push(element),
                Err(e) => {
                    warn!("skipping entry {:?}: {}", entry.path(), e);
                    issues.push(ScanIssue {
                        path: entry.path().to_path_buf(),
                        message: e.to_string(),
                    });
                }
            }
        }

        debug!(
            "scanned {:?}: {} elements, {} issues",
            root,
            elements.len(),
            issues.len()
        );

        Ok(ScanOutcome { elements, issues })
    }

    /// Create an Element from a directory entry
    async fn create_element(&self, entry: &walkdir::DirEntry, root: &Path) -> Result<Element> {
        let metadata = entry
            .metadata()
            .map_err(|e| DdirError::path_error(entry.path(), format!("failed to read metadata: {e}")))?;

        let relative_path = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| DdirError::path_error(entry.path(), format!("failed to create relative path: {e}")))?
            .to_path_buf();

        let kind = if metadata.is_dir() {
            ElementKind::Directory
        } else {
            ElementKind::File
        };

        let hash = if self.options.collect_hashes && metadata.is_file() {
            Some(self.compute_file_hash(entry.path()).await?)
        } else {
            None
        };

        Ok(Element {
            relative_path,
            kind,
            modified: ModTime::from(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH)),
            hash,
        })
    }

    /// Compute a file digest using the configured algorithm
    async fn compute_file_hash(&self, path: &Path) -> Result<String> {
        use sha2::{Digest, Sha256};

        let mut file = fs::File::open(path)
            .await
            .map_err(|e| DdirError::hash_error(path, format!("failed to open file: {e}")))?;

        let mut buffer = vec![0; 8192];

        match self.options.hash_algorithm {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();

                loop {
                    let bytes_read = file
                        .read(&mut buffer)
                        .await
                        .map_err(|e| DdirError::hash_error(path, format!("failed to read file: {e}")))?;

                    if bytes_read == 0 {
                        break;
                    }

                    hasher.update(&buffer[..bytes_read]);
                }

                Ok(format!("{:x}", hasher.finalize()))
            }
            HashAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();

                loop {
                    let bytes_read = file
                        .read(&mut buffer)
                        .await
                        .map_err(|e| DdirError::hash_error(path, format!("failed to read file: {e}")))?;

                    if bytes_read == 0 {
                        break;
                    }

                    hasher.update(&buffer[..bytes_read]);
                }

                Ok(hasher.finalize().to_hex().to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::fs;

    #[tokio::test]
    async fn scans_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("file1.txt"), b"content1").await.unwrap();
        fs::create_dir(root.join("subdir")).await.unwrap();
        fs::write(root.join("subdir").join("file2.txt"), b"content2")
            .await
            .unwrap();

        let scanner = TreeScanner::new(ScanOptions::default()).unwrap();
        let outcome = scanner.scan(root).await.unwrap();

        let paths: Vec<_> = outcome
            .elements
            .iter()
            .map(|e| e.relative_path.clone())
            .collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("file1.txt"),
                PathBuf::from("subdir"),
                PathBuf::from("subdir/file2.txt"),
            ]
        );
        assert!(outcome.issues.is_empty());

        let subdir = &outcome.elements[1];
        assert!(subdir.is_dir());
        assert!(subdir.hash.is_none());
    }

    #[tokio::test]
    async fn collects_hashes_for_files_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("test.txt"), b"test content").await.unwrap();

        let scanner = TreeScanner::new(ScanOptions::default()).unwrap();
        let outcome = scanner.scan(root).await.unwrap();

        assert!(outcome.elements[0].hash.is_some());

        let scanner = TreeScanner::new(ScanOptions {
            collect_hashes: false,
            ..Default::default()
        })
        .unwrap();
        let outcome = scanner.scan(root).await.unwrap();

        assert!(outcome.elements[0].hash.is_none());
    }

    #[tokio::test]
    async fn skips_own_metadata_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join(METADATA_DIR)).await.unwrap();
        fs::write(root.join(METADATA_DIR).join("ddir.json"), b"{}")
            .await
            .unwrap();
        fs::write(root.join("kept.txt"), b"kept").await.unwrap();

        let scanner = TreeScanner::new(ScanOptions::default()).unwrap();
        let outcome = scanner.scan(root).await.unwrap();

        assert_eq!(outcome.elements.len(), 1);
        assert_eq!(outcome.elements[0].relative_path, PathBuf::from("kept.txt"));
    }

    #[tokio::test]
    async fn honours_ignore_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("venv")).await.unwrap();
        fs::write(root.join("venv").join("lib.py"), b"x").await.unwrap();
        fs::write(root.join("kept.py"), b"y").await.unwrap();

        let scanner = TreeScanner::new(ScanOptions {
            ignore: vec!["venv".to_string()],
            ..Default::default()
        })
        .unwrap();
        let outcome = scanner.scan(root).await.unwrap();

        assert_eq!(outcome.elements.len(), 1);
        assert_eq!(outcome.elements[0].relative_path, PathBuf::from("kept.py"));
    }

    #[tokio::test]
    async fn missing_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        let scanner = TreeScanner::new(ScanOptions::default()).unwrap();
        let result = scanner.scan(&missing).await;

        assert!(matches!(result, Err(DdirError::Scan { .. })));
    }
}
