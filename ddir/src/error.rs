//! Error types for the ddir library

use std::path::PathBuf;

/// Result type alias for ddir operations
pub type Result<T> = std::result::Result<T, DdirError>;

/// Comprehensive error type for diff creation and resolution
#[derive(Debug, thiserror::Error)]
pub enum DdirError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path-related errors
    #[error("path error at {path:?}: {message}")]
    Path { path: PathBuf, message: String },

    /// Directory scanning errors (fatal, i.e. concerning the root)
    #[error("directory scan error at {path:?}: {message}")]
    Scan { path: PathBuf, message: String },

    /// Hash computation errors
    #[error("hash computation error for {path:?}: {message}")]
    Hash { path: PathBuf, message: String },

    /// Malformed line in a diff file
    #[error("malformed diff at line {line}: \"{content}\": {message}")]
    Codec {
        line: usize,
        content: String,
        message: String,
    },

    /// Invalid mode policy string
    #[error("invalid modes \"{0}\": expected exactly five digits, each 0 (skip), 1 (apply) or 2 (manual)")]
    InvalidModes(String),

    /// Ignore pattern compilation errors
    #[error("ignore pattern error: {0}")]
    IgnorePattern(String),

    /// A target with the given name does not exist
    #[error("target \"{0}\" does not exist")]
    TargetNotFound(String),

    /// A target with the given name already exists
    #[error("target \"{0}\" already exists")]
    TargetExists(String),

    /// The directory is not controlled by ddir
    #[error("{0:?} is not controlled by ddir; run `ddir init` first")]
    NotInitialized(PathBuf),

    /// The directory is already controlled by ddir
    #[error("{0:?} is already controlled by ddir")]
    AlreadyInitialized(PathBuf),

    /// File or directory copy errors
    #[error("copy error: {message}")]
    Copy { message: String },

    /// File or directory deletion errors
    #[error("deletion error at {path:?}: {message}")]
    Deletion { path: PathBuf, message: String },

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl DdirError {
    /// Create a new path error
    pub fn path_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new scan error
    pub fn scan_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Scan {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new hash error
    pub fn hash_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Hash {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new codec error for a single diff line
    pub fn codec_error(line: usize, content: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Codec {
            line,
            content: content.into(),
            message: message.into(),
        }
    }

    /// Create a new copy error
    pub fn copy_error(
        source: impl AsRef<std::path::Path>,
        dest: impl AsRef<std::path::Path>,
        message: impl Into<String>,
    ) -> Self {
        let full_message = format!(
            "copying {:?} to {:?}: {}",
            source.as_ref(),
            dest.as_ref(),
            message.into()
        );
        Self::Copy {
            message: full_message,
        }
    }

    /// Create a new deletion error
    pub fn deletion_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Deletion {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Process exit code associated with this error, used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotInitialized(_) => 2,
            Self::AlreadyInitialized(_) => 3,
            Self::TargetNotFound(_) => 10,
            Self::TargetExists(_) => 11,
            Self::InvalidModes(_) => 20,
            _ => 1,
        }
    }
}
