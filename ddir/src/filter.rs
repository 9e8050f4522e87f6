//! Ignore patterns from the global configuration, compiled with globset

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{DdirError, Result};

/// Compiled ignore patterns.
///
/// Each configured pattern matches both at the root and at any depth, so
/// `venv` prunes `venv/` as well as `sub/venv/`.
pub struct IgnoreFilter {
    set: GlobSet,
}

impl IgnoreFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            builder.add(Self::compile(pattern)?);
            builder.add(Self::compile(&format!("**/{pattern}"))?);
        }

        let set = builder.build().map_err(|e| {
            DdirError::IgnorePattern(format!("failed to build ignore set: {e}"))
        })?;

        Ok(Self { set })
    }

    /// Check a path relative to the scan root against the ignore patterns
    pub fn is_ignored(&self, relative_path: &Path) -> bool {
        self.set.is_match(relative_path)
    }

    fn compile(pattern: &str) -> Result<Glob> {
        Glob::new(pattern).map_err(|e| {
            DdirError::IgnorePattern(format!("failed to compile glob \"{pattern}\": {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn patterns_match_at_any_depth() {
        let filter = IgnoreFilter::new(&["venv".to_string(), ".DS_Store".to_string()]).unwrap();

        assert!(filter.is_ignored(&PathBuf::from("venv")));
        assert!(filter.is_ignored(&PathBuf::from("project/venv")));
        assert!(filter.is_ignored(&PathBuf::from("a/b/.DS_Store")));
        assert!(!filter.is_ignored(&PathBuf::from("src/main.py")));
    }

    #[test]
    fn empty_pattern_list_ignores_nothing() {
        let filter = IgnoreFilter::new(&[]).unwrap();
        assert!(!filter.is_ignored(&PathBuf::from("anything")));
    }

    #[test]
    fn wildcards_are_supported() {
        let filter = IgnoreFilter::new(&["*.tmp".to_string()]).unwrap();

        assert!(filter.is_ignored(&PathBuf::from("scratch.tmp")));
        assert!(filter.is_ignored(&PathBuf::from("deep/scratch.tmp")));
        assert!(!filter.is_ignored(&PathBuf::from("scratch.txt")));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let result = IgnoreFilter::new(&["a{".to_string()]);
        assert!(matches!(result, Err(DdirError::IgnorePattern(_))));
    }
}
