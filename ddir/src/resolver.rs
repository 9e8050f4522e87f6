//! Applies diff records to the filesystem under a mode policy

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::diff::{DiffRecord, DiffType};
use crate::error::{DdirError, Result};
use crate::preservation;

/// How to handle diffs of one type during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Skip,
    Apply,
    Manual,
}

impl Mode {
    fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '0' => Some(Self::Skip),
            '1' => Some(Self::Apply),
            '2' => Some(Self::Manual),
            _ => None,
        }
    }
}

/// One mode per diff type, in the fixed order `+ - > < ?`.
///
/// Parsed from a five-digit string such as `10120`: skip `-` and `?`,
/// apply `+` and `>`, ask for `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy([Mode; 5]);

impl ModePolicy {
    pub fn new(modes: [Mode; 5]) -> Self {
        Self(modes)
    }

    pub fn skip_all() -> Self {
        Self([Mode::Skip; 5])
    }

    pub fn mode_for(&self, diff_type: DiffType) -> Mode {
        self.0[diff_type.index()]
    }
}

impl FromStr for ModePolicy {
    type Err = DdirError;

    fn from_str(s: &str) -> Result<Self> {
        let modes: Vec<Mode> = s.chars().filter_map(Mode::from_digit).collect();

        if modes.len() != 5 || s.chars().count() != 5 {
            return Err(DdirError::InvalidModes(s.to_string()));
        }

        Ok(Self([modes[0], modes[1], modes[2], modes[3], modes[4]]))
    }
}

/// Decision for a single record when the policy says manual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualChoice {
    /// Apply the type's fixed action
    Apply,
    /// Leave both sides untouched
    Skip,
    /// Apply with the copy direction reversed; only meaningful for types
    /// where both sides exist (`>`, `<`, `?`)
    Swap,
}

/// Supplies the per-record decision for manual-mode records.
///
/// The resolver never assumes a terminal; interactive frontends implement
/// this with a prompt, scripted ones with a canned sequence.
pub trait DecisionProvider {
    fn decide(&mut self, record: &DiffRecord) -> ManualChoice;
}

/// Scripted provider: hands out a fixed sequence of choices, then skips
pub struct ScriptedDecisions {
    choices: VecDeque<ManualChoice>,
}

impl ScriptedDecisions {
    pub fn new(choices: impl IntoIterator<Item = ManualChoice>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
        }
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn decide(&mut self, _record: &DiffRecord) -> ManualChoice {
        self.choices.pop_front().unwrap_or(ManualChoice::Skip)
    }
}

/// Outcome of resolving a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped,
    /// Deferred to a manual decision, then applied
    ManualApplied,
    /// Deferred to a manual decision, then skipped
    ManualSkipped,
    Failed(String),
}

/// One record together with its outcome
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub record: DiffRecord,
    pub outcome: Outcome,
}

/// Full report of a resolution run, in record order
#[derive(Debug, Default)]
pub struct ResolveReport {
    pub outcomes: Vec<RecordOutcome>,
}

impl ResolveReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Applied | Outcome::ManualApplied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped | Outcome::ManualSkipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn summary(&self) -> String {
        format!(
            "{} records: {} applied, {} skipped, {} failed",
            self.outcomes.len(),
            self.applied(),
            self.skipped(),
            self.failed()
        )
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|entry| predicate(&entry.outcome))
            .count()
    }
}

/// Replays diff records against the filesystem.
///
/// Records are processed independently and in order; a failure on one
/// record is recorded as `Failed` and resolution continues with the next.
/// Nothing is ever retried automatically.
pub struct Resolver {
    source_root: PathBuf,
    destination_root: PathBuf,
    policy: ModePolicy,
}

impl Resolver {
    pub fn new(
        source_root: impl Into<PathBuf>,
        destination_root: impl Into<PathBuf>,
        policy: ModePolicy,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            policy,
        }
    }

    /// Apply each record according to the policy value for its diff type
    pub async fn resolve(
        &self,
        records: &[DiffRecord],
        provider: &mut dyn DecisionProvider,
    ) -> ResolveReport {
        let mut report = ResolveReport::default();

        for record in records {
            let outcome = self.resolve_record(record, provider).await;
            report.outcomes.push(RecordOutcome {
                record: record.clone(),
                outcome,
            });
        }

        info!("{}", report.summary());
        report
    }

    async fn resolve_record(
        &self,
        record: &DiffRecord,
        provider: &mut dyn DecisionProvider,
    ) -> Outcome {
        let (choice, manual) = match self.policy.mode_for(record.diff_type) {
            Mode::Skip => (ManualChoice::Skip, false),
            Mode::Apply => (ManualChoice::Apply, false),
            Mode::Manual => (provider.decide(record), true),
        };

        let swapped = match choice {
            ManualChoice::Skip => {
                return if manual {
                    Outcome::ManualSkipped
                } else {
                    Outcome::Skipped
                };
            }
            ManualChoice::Apply => false,
            ManualChoice::Swap => {
                // Swapping needs a second side to copy from
                if matches!(record.diff_type, DiffType::Positive | DiffType::Negative) {
                    warn!(
                        "swap is not applicable to {} diffs, skipping {:?}",
                        record.diff_type, record.source
                    );
                    return Outcome::ManualSkipped;
                }
                true
            }
        };

        match self.apply(record, swapped).await {
            Ok(()) => {
                if manual {
                    Outcome::ManualApplied
                } else {
                    Outcome::Applied
                }
            }
            Err(e) => {
                warn!("failed to apply {:?}: {}", record.source, e);
                Outcome::Failed(e.to_string())
            }
        }
    }

    /// The filesystem action per diff type is fixed by design: `+`, `>` and
    /// `?` copy source to destination, `<` copies destination to source,
    /// `-` deletes the destination element.
    async fn apply(&self, record: &DiffRecord, swapped: bool) -> Result<()> {
        let source = self.source_root.join(&record.source);
        let destination = self.destination_root.join(&record.destination);

        use DiffType::*;
        match (record.diff_type, swapped) {
            (Negative, _) => self.delete(&destination).await,
            (Positive | Newer | Unknown, false) | (Older, true) => {
                self.copy_element(&source, &destination).await
            }
            (Older, false) | (Newer | Unknown, true) => {
                self.copy_element(&destination, &source).await
            }
            // Unreachable: swap on Positive is rejected before apply
            (Positive, true) => Ok(()),
        }
    }

    /// Copy one element, recursively for directories, preserving the
    /// modification time on every copied entry. Parent directories of the
    /// target are created as needed.
    async fn copy_element(&self, from: &Path, to: &Path) -> Result<()> {
        let metadata = fs::symlink_metadata(from)
            .await
            .map_err(|e| DdirError::copy_error(from, to, format!("source unavailable: {e}")))?;

        // An existing element of the other kind would block the copy;
        // overwriting means it has to go first
        if let Ok(existing) = fs::symlink_metadata(to).await {
            if existing.is_dir() != metadata.is_dir() {
                self.delete(to).await?;
            }
        }

        if metadata.is_dir() {
            fs::create_dir_all(to)
                .await
                .map_err(|e| DdirError::copy_error(from, to, format!("failed to create directory: {e}")))?;

            let mut entries = fs::read_dir(from)
                .await
                .map_err(|e| DdirError::copy_error(from, to, format!("failed to list directory: {e}")))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| DdirError::copy_error(from, to, format!("failed to list directory: {e}")))?
            {
                let child_to = to.join(entry.file_name());
                Box::pin(self.copy_element(&entry.path(), &child_to)).await?;
            }

            preservation::copy_mtime(from, to).await
        } else {
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    DdirError::copy_error(from, to, format!("failed to create parent directory: {e}"))
                })?;
            }

            fs::copy(from, to)
                .await
                .map_err(|e| DdirError::copy_error(from, to, format!("failed to copy file: {e}")))?;

            preservation::copy_mtime(from, to).await
        }
    }

    /// Delete a file or directory (recursively)
    async fn delete(&self, path: &Path) -> Result<()> {
        let metadata = fs::symlink_metadata(path)
            .await
            .map_err(|e| DdirError::deletion_error(path, format!("target unavailable: {e}")))?;

        if metadata.is_dir() {
            fs::remove_dir_all(path)
                .await
                .map_err(|e| DdirError::deletion_error(path, format!("failed to delete directory: {e}")))
        } else {
            fs::remove_file(path)
                .await
                .map_err(|e| DdirError::deletion_error(path, format!("failed to delete file: {e}")))
        }
    }
}
