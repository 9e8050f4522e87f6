//! Migration from the v1 metadata layout
//!
//! The v1 layout stored a single destination as plain files directly in
//! `.ddir`: a `destination` file with the path, an optional `fast_mode`
//! file containing `on`, and the diff files next to them. Migration turns
//! that into the v2 layout with a `default` target.

use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::error::{DdirError, Result};
use crate::target::{self, GlobalConfig, Target};

const V1_DESTINATION_FILE: &str = "destination";
const V1_FAST_MODE_FILE: &str = "fast_mode";

/// What [`migrate`] found and did
#[derive(Debug)]
pub enum MigrationOutcome {
    /// The source used the v1 layout and was upgraded. `target` is None
    /// when the v1 layout had no destination configured.
    Migrated {
        target: Option<Target>,
        moved_diffs: usize,
    },
    /// The source already uses the current layout
    AlreadyCurrent,
    /// The directory is not controlled at all
    NotControlled,
}

/// Detect the metadata layout of a source and upgrade it if it is outdated
pub async fn migrate(source_root: &Path) -> Result<MigrationOutcome> {
    let metadata = target::metadata_dir(source_root);
    let current = metadata.join(target::TARGET_DIR);

    if current.exists() {
        return Ok(MigrationOutcome::AlreadyCurrent);
    }
    if !metadata.exists() {
        return Ok(MigrationOutcome::NotControlled);
    }

    info!("upgrading v1 metadata at {:?}", metadata);
    v1_to_v2(source_root).await
}

async fn v1_to_v2(source_root: &Path) -> Result<MigrationOutcome> {
    let metadata = target::metadata_dir(source_root);

    fs::create_dir_all(metadata.join(target::TARGET_DIR))
        .await
        .map_err(|e| DdirError::path_error(&metadata, format!("failed to upgrade layout: {e}")))?;
    GlobalConfig::default().save(source_root).await?;

    let destination_file = metadata.join(V1_DESTINATION_FILE);
    if !destination_file.is_file() {
        warn!("no v1 destination configured, not creating a target");
        return Ok(MigrationOutcome::Migrated {
            target: None,
            moved_diffs: 0,
        });
    }

    let destination = fs::read_to_string(&destination_file)
        .await
        .map_err(|e| DdirError::path_error(&destination_file, format!("failed to read v1 destination: {e}")))?
        .trim()
        .to_string();

    let fast_mode_file = metadata.join(V1_FAST_MODE_FILE);
    let fast_mode = match fs::read_to_string(&fast_mode_file).await {
        Ok(raw) => {
            fs::remove_file(&fast_mode_file).await.ok();
            raw.trim() == "on"
        }
        Err(_) => false,
    };

    let migrated = target::create(source_root, "default", Path::new(&destination), fast_mode).await?;
    let moved_diffs = move_diffs(&metadata, &migrated.this).await?;

    fs::remove_file(&destination_file)
        .await
        .map_err(|e| DdirError::path_error(&destination_file, format!("failed to remove v1 file: {e}")))?;

    info!(
        "created target {} for {:?}, moved {} diff files",
        migrated.name, migrated.path, moved_diffs
    );

    Ok(MigrationOutcome::Migrated {
        target: Some(migrated),
        moved_diffs,
    })
}

/// Move the loose v1 diff files into the new target's directory
async fn move_diffs(metadata: &Path, target_dir: &Path) -> Result<usize> {
    let mut moved = 0;

    let mut entries = fs::read_dir(metadata)
        .await
        .map_err(|e| DdirError::path_error(metadata, format!("failed to list v1 diffs: {e}")))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DdirError::path_error(metadata, format!("failed to list v1 diffs: {e}")))?
    {
        let path = entry.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "diff") {
            continue;
        }

        let file_name = match path.file_name() {
            Some(name) => name.to_owned(),
            None => continue,
        };

        fs::rename(&path, target_dir.join(&file_name))
            .await
            .map_err(|e| DdirError::path_error(&path, format!("failed to move diff file: {e}")))?;
        moved += 1;
    }

    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seed_v1(root: &Path, destination: Option<&str>, fast_mode: Option<&str>) {
        let metadata = target::metadata_dir(root);
        fs::create_dir_all(&metadata).await.unwrap();

        if let Some(destination) = destination {
            fs::write(metadata.join(V1_DESTINATION_FILE), destination)
                .await
                .unwrap();
        }
        if let Some(value) = fast_mode {
            fs::write(metadata.join(V1_FAST_MODE_FILE), value).await.unwrap();
        }
    }

    #[tokio::test]
    async fn uncontrolled_directory_is_reported() {
        let temp_dir = TempDir::new().unwrap();

        let outcome = migrate(temp_dir.path()).await.unwrap();
        assert!(matches!(outcome, MigrationOutcome::NotControlled));
    }

    #[tokio::test]
    async fn current_layout_is_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        target::init(temp_dir.path()).await.unwrap();

        let outcome = migrate(temp_dir.path()).await.unwrap();
        assert!(matches!(outcome, MigrationOutcome::AlreadyCurrent));
    }

    #[tokio::test]
    async fn v1_layout_becomes_a_default_target() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        seed_v1(root, Some("/mnt/backup\n"), Some("on")).await;

        let metadata = target::metadata_dir(root);
        fs::write(metadata.join("2023-01-01-1.diff"), "+:f:a.txt:a.txt\n")
            .await
            .unwrap();

        let outcome = migrate(root).await.unwrap();

        let migrated = match outcome {
            MigrationOutcome::Migrated {
                target: Some(target),
                moved_diffs,
            } => {
                assert_eq!(moved_diffs, 1);
                target
            }
            other => panic!("expected migration with a target, got {other:?}"),
        };

        assert_eq!(migrated.name, "default");
        assert_eq!(migrated.path, Path::new("/mnt/backup"));
        assert!(migrated.fast_mode);
        assert!(migrated.this.join("2023-01-01-1.diff").is_file());

        // v1 files are gone and the layout is now current
        assert!(!metadata.join(V1_DESTINATION_FILE).exists());
        assert!(!metadata.join(V1_FAST_MODE_FILE).exists());
        assert!(target::is_initialized(root));

        let loaded = target::load(root, "default").await.unwrap();
        assert_eq!(loaded.path, Path::new("/mnt/backup"));
    }

    #[tokio::test]
    async fn v1_without_destination_migrates_without_a_target() {
        let temp_dir = TempDir::new().unwrap();
        seed_v1(temp_dir.path(), None, None).await;

        let outcome = migrate(temp_dir.path()).await.unwrap();

        assert!(matches!(
            outcome,
            MigrationOutcome::Migrated { target: None, .. }
        ));
        assert!(target::load_all(temp_dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_fast_mode_file_defaults_off() {
        let temp_dir = TempDir::new().unwrap();
        seed_v1(temp_dir.path(), Some("/mnt/backup"), None).await;

        migrate(temp_dir.path()).await.unwrap();

        let migrated = target::load(temp_dir.path(), "default").await.unwrap();
        assert!(!migrated.fast_mode);
    }
}
