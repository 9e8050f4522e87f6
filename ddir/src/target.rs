//! Target metadata and the `.ddir` layout
//!
//! A source directory controlled by ddir carries a `.ddir` directory with
//! the global `ddir.json` configuration and one subdirectory per target
//! under `target.d`, named by the digest of the target's name. Each target
//! directory holds a `target.json` and the diff files created for that
//! target. Every operation takes the source root explicitly; there is no
//! ambient current-target state.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DdirError, Result};

/// Name of the metadata directory nested in a controlled source root
pub const METADATA_DIR: &str = ".ddir";
/// Subdirectory of the metadata directory holding all targets
pub const TARGET_DIR: &str = "target.d";
/// Global configuration file inside the metadata directory
pub const CONFIG_FILE: &str = "ddir.json";
/// Per-target metadata file
pub const TARGET_FILE: &str = "target.json";
/// Format version written by this implementation
pub const API_VERSION: &str = "v2";

/// Content of `.ddir/ddir.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Version string indicating how the `.ddir` directory is formatted
    #[serde(rename = "api-version")]
    pub api_version: String,
    /// Glob patterns ignored during scanning
    pub ignore: Vec<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            ignore: vec![
                METADATA_DIR.to_string(),
                "venv".to_string(),
                ".DS_Store".to_string(),
            ],
        }
    }
}

impl GlobalConfig {
    pub async fn load(source_root: &Path) -> Result<Self> {
        let path = metadata_dir(source_root).join(CONFIG_FILE);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DdirError::NotInitialized(source_root.to_path_buf()));
            }
            Err(e) => {
                return Err(DdirError::path_error(
                    &path,
                    format!("failed to read configuration: {e}"),
                ));
            }
        };

        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn save(&self, source_root: &Path) -> Result<()> {
        let path = metadata_dir(source_root).join(CONFIG_FILE);
        let raw = serde_json::to_string_pretty(self)?;

        fs::write(&path, raw)
            .await
            .map_err(|e| DdirError::path_error(&path, format!("failed to write configuration: {e}")))
    }
}

/// Digest of a target name, used as its directory name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameHash {
    pub algo: String,
    pub value: String,
}

impl NameHash {
    pub fn of(name: &str) -> Self {
        Self {
            algo: "blake3".to_string(),
            value: blake3::hash(name.as_bytes()).to_hex().to_string(),
        }
    }
}

/// Information on a single target: a named destination paired with the
/// comparison mode to use for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Human-friendly name
    pub name: String,
    /// Digest of the name, used for the on-disk directory
    pub hash: NameHash,
    /// Absolute path of this target's config directory
    pub this: PathBuf,
    /// Absolute path of the destination tree
    pub path: PathBuf,
    /// Trust timestamps only when creating diffs, skipping content hashes
    #[serde(rename = "fast-mode")]
    pub fast_mode: bool,
}

/// Metadata of one stored diff file
#[derive(Debug, Clone)]
pub struct DiffMeta {
    pub path: PathBuf,
    pub created: DateTime<Local>,
}

pub fn metadata_dir(source_root: &Path) -> PathBuf {
    source_root.join(METADATA_DIR)
}

fn target_dir(source_root: &Path) -> PathBuf {
    metadata_dir(source_root).join(TARGET_DIR)
}

pub fn is_initialized(source_root: &Path) -> bool {
    metadata_dir(source_root).is_dir()
}

fn ensure_initialized(source_root: &Path) -> Result<()> {
    if !is_initialized(source_root) {
        return Err(DdirError::NotInitialized(source_root.to_path_buf()));
    }
    Ok(())
}

/// Initialize a directory as a ddir source: create the metadata directory,
/// the default configuration and the (empty) target directory.
pub async fn init(source_root: &Path) -> Result<()> {
    if is_initialized(source_root) {
        return Err(DdirError::AlreadyInitialized(source_root.to_path_buf()));
    }

    fs::create_dir_all(target_dir(source_root))
        .await
        .map_err(|e| DdirError::path_error(source_root, format!("failed to initialize: {e}")))?;

    GlobalConfig::default().save(source_root).await?;

    debug!("initialized ddir source at {:?}", source_root);
    Ok(())
}

/// Create a new target; fails if a target with the same name exists
pub async fn create(
    source_root: &Path,
    name: &str,
    destination: &Path,
    fast_mode: bool,
) -> Result<Target> {
    ensure_initialized(source_root)?;

    let hash = NameHash::of(name);
    let this = target_dir(source_root).join(&hash.value);

    if this.exists() {
        return Err(DdirError::TargetExists(name.to_string()));
    }

    let target = Target {
        name: name.to_string(),
        hash,
        this: this.clone(),
        path: destination.to_path_buf(),
        fast_mode,
    };

    fs::create_dir_all(&this)
        .await
        .map_err(|e| DdirError::path_error(&this, format!("failed to create target directory: {e}")))?;

    let raw = serde_json::to_string_pretty(&target)?;
    fs::write(this.join(TARGET_FILE), raw)
        .await
        .map_err(|e| DdirError::path_error(&this, format!("failed to write target metadata: {e}")))?;

    Ok(target)
}

/// Load all targets of a source
pub async fn load_all(source_root: &Path) -> Result<Vec<Target>> {
    ensure_initialized(source_root)?;

    let mut targets = Vec::new();
    let dir = target_dir(source_root);

    if !dir.is_dir() {
        return Ok(targets);
    }

    let mut entries = fs::read_dir(&dir)
        .await
        .map_err(|e| DdirError::path_error(&dir, format!("failed to list targets: {e}")))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DdirError::path_error(&dir, format!("failed to list targets: {e}")))?
    {
        let metadata_path = entry.path().join(TARGET_FILE);
        if !metadata_path.is_file() {
            continue;
        }

        let raw = fs::read_to_string(&metadata_path)
            .await
            .map_err(|e| DdirError::path_error(&metadata_path, format!("failed to read target: {e}")))?;

        let mut target: Target = serde_json::from_str(&raw)?;
        // The stored path may be stale if the source tree moved
        target.this = entry.path();
        targets.push(target);
    }

    targets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(targets)
}

/// Load one target by its human-friendly name
pub async fn load(source_root: &Path, name: &str) -> Result<Target> {
    load_all(source_root)
        .await?
        .into_iter()
        .find(|target| target.name == name)
        .ok_or_else(|| DdirError::TargetNotFound(name.to_string()))
}

/// Delete a target and all of its stored diffs
pub async fn delete(source_root: &Path, name: &str) -> Result<()> {
    let target = load(source_root, name).await?;

    fs::remove_dir_all(&target.this)
        .await
        .map_err(|e| DdirError::deletion_error(&target.this, format!("failed to delete target: {e}")))
}

/// List metadata of all diff files stored for a target, oldest first
pub async fn list_diffs(target: &Target) -> Result<Vec<DiffMeta>> {
    let mut diffs = Vec::new();

    let mut entries = fs::read_dir(&target.this)
        .await
        .map_err(|e| DdirError::path_error(&target.this, format!("failed to list diffs: {e}")))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DdirError::path_error(&target.this, format!("failed to list diffs: {e}")))?
    {
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "diff") {
            continue;
        }

        let modified = entry
            .metadata()
            .await
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        diffs.push(DiffMeta {
            path,
            created: DateTime::from(modified),
        });
    }

    diffs.sort_by_key(|meta| meta.created);
    Ok(diffs)
}

/// Fresh path for a new diff file inside the target's directory, named by
/// creation date plus a disambiguating suffix
pub fn new_diff_path(target: &Target) -> PathBuf {
    let name = format!(
        "{}-{}.diff",
        Local::now().format("%Y-%m-%d"),
        Uuid::new_v4().simple()
    );
    target.this.join(name)
}
