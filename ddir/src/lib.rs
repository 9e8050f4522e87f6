//! Directory diffing and resolution
//!
//! ddir compares a source directory tree against a destination tree and
//! classifies every difference into one of five types: `+` (only in
//! source), `-` (only in destination), `>` (source newer), `<` (source
//! older) and `?` (not comparable). Diffs are persisted as line-oriented
//! files under the source's `.ddir` metadata directory and can later be
//! replayed against the filesystem under a per-type skip/apply/manual
//! policy.
//!
//! The typical flow mirrors the CLI:
//!
//! 1. [`target::init`] puts a source directory under control
//! 2. [`target::create`] registers a named destination
//! 3. [`create_diff`] scans both trees and writes a diff file
//! 4. [`resolve_diff`] replays a stored diff under a [`resolver::ModePolicy`]

pub mod codec;
pub mod comparator;
pub mod diff;
pub mod element;
pub mod error;
pub mod filter;
pub mod legacy;
pub mod preservation;
pub mod resolver;
pub mod scanner;
pub mod target;
pub mod timestamp;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::comparator::Comparator;
use crate::diff::DiffRecord;
use crate::error::Result;
use crate::resolver::{DecisionProvider, ModePolicy, ResolveReport, Resolver};
use crate::scanner::{ScanIssue, ScanOptions, TreeScanner};
use crate::target::Target;

/// Result of creating a diff for a target
#[derive(Debug)]
pub struct CreateOutcome {
    /// Where the diff file was written
    pub diff_path: PathBuf,
    /// The records, in scan order
    pub records: Vec<DiffRecord>,
    /// Non-fatal problems from scanning either tree
    pub issues: Vec<ScanIssue>,
}

/// Scan the source tree and the target's destination tree, compare them and
/// persist the resulting records as a new diff file in the target's
/// directory.
///
/// In fast mode only timestamps are compared and no content hashes are
/// collected. `ignore` patterns are applied to both trees.
pub async fn create_diff(
    source_root: &Path,
    target: &Target,
    ignore: &[String],
) -> Result<CreateOutcome> {
    let scanner = TreeScanner::new(ScanOptions {
        collect_hashes: !target.fast_mode,
        ignore: ignore.to_vec(),
        ..Default::default()
    })?;

    let source = scanner.scan(source_root).await?;
    let destination = scanner.scan(&target.path).await?;

    let records = Comparator::new(target.fast_mode).compare(&source.elements, &destination.elements);

    let diff_path = target::new_diff_path(target);
    codec::write_diff_file(&diff_path, &records).await?;

    info!(
        "created diff for target {} with {} records at {:?}",
        target.name,
        records.len(),
        diff_path
    );

    let mut issues = source.issues;
    issues.extend(destination.issues);

    Ok(CreateOutcome {
        diff_path,
        records,
        issues,
    })
}

/// Read a stored diff file and replay its records between the source tree
/// and the target's destination tree under the given policy.
pub async fn resolve_diff(
    source_root: &Path,
    target: &Target,
    diff_path: &Path,
    policy: ModePolicy,
    provider: &mut dyn DecisionProvider,
) -> Result<ResolveReport> {
    let records = codec::read_diff_file(diff_path).await?;

    let resolver = Resolver::new(source_root, &target.path, policy);
    Ok(resolver.resolve(&records, provider).await)
}
