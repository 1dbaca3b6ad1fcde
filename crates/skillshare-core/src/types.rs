//! Small shared value types used across subsystems.

use serde::{Deserialize, Serialize};

/// Either a single shared library serving many tools, or a project-local
/// `.skillshare/` folder. The two are never mixed within one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Global,
    Project,
}

/// Sync materialization mode for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    Merge,
    Symlink,
    Copy,
}

impl Default for LinkMode {
    fn default() -> Self {
        LinkMode::Merge
    }
}

impl std::fmt::Display for LinkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkMode::Merge => write!(f, "merge"),
            LinkMode::Symlink => write!(f, "symlink"),
            LinkMode::Copy => write!(f, "copy"),
        }
    }
}

impl std::str::FromStr for LinkMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(LinkMode::Merge),
            "symlink" => Ok(LinkMode::Symlink),
            "copy" => Ok(LinkMode::Copy),
            other => anyhow::bail!("unknown sync mode {other:?}"),
        }
    }
}

/// Canonical kind of a parsed [`crate::source::Source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    GitShorthand,
    GitHttps,
    GitSsh,
    GitFile,
    GithubApiSubdir,
    LocalPath,
}

impl SourceType {
    pub fn is_git(self) -> bool {
        !matches!(self, SourceType::LocalPath)
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceType::GitShorthand => "git-shorthand",
            SourceType::GitHttps => "git-https",
            SourceType::GitSsh => "git-ssh",
            SourceType::GitFile => "git-file",
            SourceType::GithubApiSubdir => "github-api-subdir",
            SourceType::LocalPath => "local-path",
        };
        write!(f, "{s}")
    }
}
