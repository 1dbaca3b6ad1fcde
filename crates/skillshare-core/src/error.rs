//! Error taxonomy shared across the core library.
//!
//! Library functions mostly return `anyhow::Result<T>` with `.context(...)`
//! at call sites; callers that need to branch on *kind* (the CLI's exit
//! code mapping, the updater's rollback trigger) downcast to
//! [`SkillshareError`].

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SkillshareError {
    #[error("could not parse source {raw:?}: {reason}")]
    SourceParse { raw: String, reason: String },

    #[error("clone failed: {kind:?}: {message}")]
    Clone {
        kind: crate::git::ErrorKind,
        message: String,
    },

    #[error("subdir {subdir:?} not found in {clone_url}")]
    SubdirNotFound { clone_url: String, subdir: String },

    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("working tree at {path} is dirty")]
    DirtyWorkingTree { path: PathBuf },

    #[error("target {name:?} conflicts with existing unmanaged entry at {path}")]
    ConflictingTarget { name: String, path: PathBuf },

    #[error("invalid glob pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("audit blocked at severity {severity:?}")]
    AuditBlocked { severity: crate::audit::Severity },

    #[error("no configuration found (run `skillshare init`)")]
    NoConfig,

    #[error("source directory {path} does not exist")]
    SourceMissing { path: PathBuf },

    #[error("manifest at {path} is corrupted: {reason}")]
    ManifestCorrupted { path: PathBuf, reason: String },

    #[error("authentication failed for {url}")]
    AuthFailure { url: String },

    #[error("invalid time format {input:?}")]
    InvalidTimeFormat { input: String },
}

impl SkillshareError {
    /// Process exit code this error should produce when it is the sole
    /// cause of a command failure.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
