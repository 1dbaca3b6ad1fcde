//! `.skillshare-meta.json`, written by the installer and read by
//! check/update.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::SourceType;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillMetadata {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    /// Commit hash, when installed from git.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// 40-hex sha1 of the skill's subdir tree at install/update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
    pub installed_at: DateTime<Utc>,
}

pub fn read(path: &Path) -> Result<Option<SkillMetadata>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let meta: SkillMetadata = serde_json::from_str(&text)
        .map_err(|e| crate::error::SkillshareError::ManifestCorrupted {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(Some(meta))
}

pub fn write(path: &Path, meta: &SkillMetadata) -> Result<()> {
    let body = serde_json::to_vec_pretty(meta).context("serializing skill metadata")?;
    crate::fs::atomic::write_atomic(path, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".skillshare-meta.json");
        let meta = SkillMetadata {
            source: "owner/repo/skills/alpha".to_string(),
            kind: SourceType::GitShorthand,
            repo_url: Some("https://github.com/owner/repo.git".to_string()),
            version: Some("abc123".to_string()),
            tree_hash: Some("d".repeat(40)),
            subdir: Some("skills/alpha".to_string()),
            installed_at: Utc::now(),
        };
        write(&path, &meta).unwrap();
        let loaded = read(&path).unwrap().unwrap();
        assert_eq!(loaded, meta);
    }

    #[test]
    fn missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read(&tmp.path().join("nope.json")).unwrap().is_none());
    }
}
