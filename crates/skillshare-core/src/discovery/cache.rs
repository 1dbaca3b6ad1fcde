//! L2 on-disk discovery cache. Filename keeps the `.gob` extension the
//! original Go tool used even though the body here is JSON — there is no
//! interop requirement with a gob reader in this reimplementation.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{DiscoveryEntry, DiscoveryResult};
use crate::config::paths::discovery_cache_dir;
use crate::skill::Skill;

#[derive(Debug, Serialize, Deserialize)]
struct CachedEntry {
    rel_path: PathBuf,
    metadata: Option<crate::skill::SkillMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    root: PathBuf,
    fingerprint_mtime: i64,
    entries: Vec<CachedEntry>,
}

fn fingerprint(root: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(root.to_string_lossy().as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

fn cache_path(root: &Path) -> PathBuf {
    discovery_cache_dir().join(format!("discovery-{}.gob", fingerprint(root)))
}

fn deepest_mtime(root: &Path) -> Result<SystemTime> {
    crate::fs::mtime::newest_mtime(root)
}

pub fn load(root: &Path) -> Result<Option<DiscoveryResult>> {
    if !root.is_dir() {
        return Ok(None);
    }
    let path = cache_path(root);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let cached: CacheFile = match serde_json::from_str(&text) {
        Ok(c) => c,
        Err(_) => return Ok(None),
    };
    if cached.root != root {
        return Ok(None);
    }
    let current_mtime = crate::fs::mtime::unix_seconds(deepest_mtime(root)?);
    if current_mtime != cached.fingerprint_mtime {
        return Ok(None);
    }
    let entries = cached
        .entries
        .into_iter()
        .map(|e| DiscoveryEntry {
            skill: Skill {
                abs_path: root.join(&e.rel_path),
                rel_path: e.rel_path,
            },
            metadata: e.metadata,
        })
        .collect();
    Ok(Some(DiscoveryResult { entries }))
}

pub fn store(root: &Path, result: &DiscoveryResult) -> Result<()> {
    let fingerprint_mtime = crate::fs::mtime::unix_seconds(deepest_mtime(root)?);
    let cache = CacheFile {
        root: root.to_path_buf(),
        fingerprint_mtime,
        entries: result
            .entries
            .iter()
            .map(|e| CachedEntry {
                rel_path: e.skill.rel_path.clone(),
                metadata: e.metadata.clone(),
            })
            .collect(),
    };
    let body = serde_json::to_vec(&cache).context("serializing discovery cache")?;
    crate::fs::atomic::write_atomic(&cache_path(root), &body)
}
