//! Modification-time preservation for copied elements

use std::path::Path;

use filetime::FileTime;
use tokio::fs;

use crate::error::{DdirError, Result};

/// Carry the source's modification time over to a freshly written copy.
///
/// The timestamps on the copy are what later diffs compare against, so a
/// copy that does not preserve them would immediately show up as newer.
pub async fn copy_mtime(source: &Path, destination: &Path) -> Result<()> {
    let metadata = fs::metadata(source)
        .await
        .map_err(|e| DdirError::copy_error(source, destination, format!("failed to read metadata: {e}")))?;

    let mtime = FileTime::from_last_modification_time(&metadata);

    filetime::set_file_mtime(destination, mtime)
        .map_err(|e| DdirError::copy_error(source, destination, format!("failed to set mtime: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn copies_the_modification_time() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.txt");
        let destination = temp_dir.path().join("destination.txt");

        fs::write(&source, b"data").await.unwrap();
        filetime::set_file_mtime(&source, FileTime::from_unix_time(1_000_000, 123_000_000))
            .unwrap();

        fs::write(&destination, b"data").await.unwrap();
        copy_mtime(&source, &destination).await.unwrap();

        let metadata = fs::metadata(&destination).await.unwrap();
        let mtime = FileTime::from_last_modification_time(&metadata);
        assert_eq!(mtime.unix_seconds(), 1_000_000);
    }

    #[tokio::test]
    async fn missing_source_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let destination = temp_dir.path().join("destination.txt");

        let result = copy_mtime(&missing, &destination).await;
        assert!(matches!(result, Err(DdirError::Copy { .. })));
    }
}
