//! Source URI parsing — canonicalizes the heterogeneous strings a user can
//! pass to `install` into a single [`Source`] record.

pub mod parser;

pub use parser::parse;

use serde::{Deserialize, Serialize};

use crate::types::SourceType;

/// Canonical descriptor for an install source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: SourceType,
    pub clone_url: String,
    pub subdir: String,
    pub name: String,
    pub raw: String,
}

impl Source {
    /// Canonical string form, preserving the `//subdir` separator so that
    /// re-parsing it round-trips, including `kind`.
    ///
    /// Shorthand sources need special handling: `clone_url` is already
    /// expanded to the full GitHub HTTPS form, so naively re-emitting it
    /// would reparse as `GitHttps` rather than the original `GitShorthand`.
    pub fn canonical(&self) -> String {
        if self.kind == SourceType::GitShorthand {
            let owner_repo = self
                .clone_url
                .strip_prefix("https://github.com/")
                .and_then(|s| s.strip_suffix(".git"))
                .unwrap_or(&self.clone_url);
            return if self.subdir.is_empty() {
                owner_repo.to_string()
            } else {
                format!("{owner_repo}/{}", self.subdir)
            };
        }
        if self.subdir.is_empty() {
            self.clone_url.clone()
        } else {
            format!("{}//{}", self.clone_url, self.subdir)
        }
    }
}
