//! `.skillshare-manifest.json`, per target, copy mode only (§3).

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const SYMLINK_SENTINEL: &str = "symlink";
pub const MANIFEST_FILE: &str = ".skillshare-manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Manifest {
    pub managed: HashMap<String, String>,
    pub mtimes: HashMap<String, i64>,
}

pub fn load(target_dir: &Path) -> Result<Manifest> {
    let path = target_dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(Manifest::default());
    }
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| {
        crate::error::SkillshareError::ManifestCorrupted {
            path,
            reason: e.to_string(),
        }
        .into()
    })
}

/// Write the manifest atomically; either the full manifest is written or
/// the previous one is left untouched (§5's "no partial manifest
/// updates" cancellation guarantee).
pub fn save(target_dir: &Path, manifest: &Manifest) -> Result<()> {
    let path = target_dir.join(MANIFEST_FILE);
    let body = serde_json::to_vec_pretty(manifest).context("serializing manifest")?;
    crate::fs::atomic::write_atomic(&path, &body)
}

pub fn remove(target_dir: &Path) -> Result<()> {
    let path = target_dir.join(MANIFEST_FILE);
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let mut m = Manifest::default();
        m.managed.insert("alpha".to_string(), "deadbeef".to_string());
        m.mtimes.insert("alpha".to_string(), 12345);
        save(tmp.path(), &m).unwrap();
        let loaded = load(tmp.path()).unwrap();
        assert_eq!(loaded, m);
    }

    #[test]
    fn missing_manifest_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(load(tmp.path()).unwrap(), Manifest::default());
    }
}
