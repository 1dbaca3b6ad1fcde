//! Rebuilds `registry.yaml` from the source tree's per-skill metadata.

use std::path::Path;

use anyhow::Result;

use super::{Registry, RegistryEntry, save};
use crate::discovery::discover;

pub fn reconcile(source_root: &Path, scope_dir: &Path) -> Result<Registry> {
    let discovery = discover(source_root)?;
    let mut registry = Registry::default();
    for entry in &discovery.entries {
        let Some(meta) = &entry.metadata else {
            continue;
        };
        registry.skills.push(RegistryEntry {
            name: entry.skill.name(),
            source: meta.source.clone(),
            group: {
                let g = entry.skill.group();
                (!g.is_empty()).then_some(g)
            },
        });
    }
    registry.skills.sort_by(|a, b| (a.group.clone(), a.name.clone()).cmp(&(b.group.clone(), b.name.clone())));
    save(scope_dir, &registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn reconcile_picks_up_metadata_source_and_group() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        let skill_dir = source.join("_repo/skills/alpha");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), "# alpha").unwrap();
        crate::skill::metadata::write(
            &skill_dir.join(".skillshare-meta.json"),
            &crate::skill::SkillMetadata {
                source: "owner/repo/skills/alpha".to_string(),
                kind: crate::types::SourceType::GitShorthand,
                repo_url: Some("https://github.com/owner/repo.git".to_string()),
                version: None,
                tree_hash: None,
                subdir: Some("skills/alpha".to_string()),
                installed_at: Utc::now(),
            },
        )
        .unwrap();

        let registry = reconcile(&source, tmp.path()).unwrap();
        assert_eq!(registry.skills.len(), 1);
        assert_eq!(registry.skills[0].name, "alpha");
        assert_eq!(registry.skills[0].group.as_deref(), Some("_repo/skills"));
        assert_eq!(registry.skills[0].source, "owner/repo/skills/alpha");
    }
}
