//! `registry.yaml` (§4.8): the scope-wide list of installed skills with
//! canonical sources, rebuilt from per-skill metadata on reconcile.

pub mod reconcile;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use reconcile::reconcile;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryEntry {
    pub name: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl RegistryEntry {
    /// Accept the legacy slash-in-name encoding on read; always emits
    /// `{name, group}` on the next save.
    fn normalized(mut self) -> Self {
        if self.group.is_none() {
            if let Some((group, leaf)) = self.name.rsplit_once('/') {
                self.group = Some(group.to_string());
                self.name = leaf.to_string();
            }
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub skills: Vec<RegistryEntry>,
}

pub const REGISTRY_FILE: &str = "registry.yaml";

pub fn load(scope_dir: &Path) -> Result<Registry> {
    let path = scope_dir.join(REGISTRY_FILE);
    if !path.exists() {
        return Ok(Registry::default());
    }
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let mut registry: Registry =
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    registry.skills = registry.skills.into_iter().map(RegistryEntry::normalized).collect();
    Ok(registry)
}

pub fn save(scope_dir: &Path, registry: &Registry) -> Result<()> {
    let path = scope_dir.join(REGISTRY_FILE);
    let body = serde_yaml::to_string(registry).context("serializing registry")?;
    crate::fs::atomic::write_atomic(&path, body.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_slash_name_normalizes_on_read() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(REGISTRY_FILE),
            "skills:\n  - name: _repo/alpha\n    source: owner/repo/alpha\n",
        )
        .unwrap();
        let registry = load(tmp.path()).unwrap();
        assert_eq!(registry.skills[0].name, "alpha");
        assert_eq!(registry.skills[0].group.as_deref(), Some("_repo"));
    }

    #[test]
    fn round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let mut registry = Registry::default();
        registry.skills.push(RegistryEntry {
            name: "alpha".to_string(),
            source: "owner/repo/alpha".to_string(),
            group: None,
        });
        save(tmp.path(), &registry).unwrap();
        let loaded = load(tmp.path()).unwrap();
        assert_eq!(loaded.skills.len(), 1);
    }
}
