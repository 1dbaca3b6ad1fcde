//! Removes an installed skill from the source tree, moving it to the
//! trash layout (`$XDG_DATA_HOME/skillshare/trash/<timestamp>/<rel>`)
//! rather than deleting outright, and reconciles the registry.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;

use crate::discovery::discover;
use crate::registry::reconcile;

#[derive(Debug, Clone)]
pub struct UninstallOptions {
    pub group: Option<String>,
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct UninstallResult {
    pub removed: Vec<String>,
    pub not_found: Vec<String>,
}

pub fn uninstall(source_root: &Path, scope_dir: &Path, names: &[String], opts: &UninstallOptions) -> Result<UninstallResult> {
    let discovery = discover(source_root)?;
    let mut removed = Vec::new();
    let mut not_found = Vec::new();

    for name in names {
        let matches: Vec<_> = discovery
            .entries
            .iter()
            .filter(|e| &e.skill.name() == name)
            .filter(|e| opts.group.as_deref().map(|g| e.skill.group() == g).unwrap_or(true))
            .collect();

        if matches.is_empty() {
            not_found.push(name.clone());
            continue;
        }
        if matches.len() > 1 && !opts.force {
            bail!(
                "name {name:?} is ambiguous across groups {:?}; pass --group or --force",
                matches.iter().map(|e| e.skill.group()).collect::<Vec<_>>()
            );
        }

        for entry in matches {
            if opts.dry_run {
                removed.push(name.clone());
                continue;
            }
            move_to_trash(source_root, &entry.skill.abs_path, &entry.skill.rel_path)?;
            removed.push(name.clone());
        }
    }

    if !opts.dry_run {
        reconcile(source_root, scope_dir)?;
    }

    Ok(UninstallResult { removed, not_found })
}

fn move_to_trash(source_root: &Path, abs_path: &Path, rel_path: &Path) -> Result<()> {
    let ts = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let dest = crate::config::paths::trash_dir().join(&ts).join(rel_path);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::rename(abs_path, &dest).with_context(|| format!("moving {} to trash", abs_path.display()))?;
    let _ = source_root;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc as UtcTime;

    #[test]
    fn uninstall_moves_skill_to_trash_and_reconciles_registry() {
        let tmp = tempfile::tempdir().unwrap();
        unsafe {
            std::env::set_var("XDG_DATA_HOME", tmp.path().join("data"));
        }
        let source = tmp.path().join("source");
        let skill_dir = source.join("alpha");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), "# alpha").unwrap();
        crate::skill::metadata::write(
            &skill_dir.join(".skillshare-meta.json"),
            &crate::skill::SkillMetadata {
                source: "owner/repo/alpha".to_string(),
                kind: crate::types::SourceType::GitShorthand,
                repo_url: Some("https://github.com/owner/repo.git".to_string()),
                version: None,
                tree_hash: None,
                subdir: Some("alpha".to_string()),
                installed_at: UtcTime::now(),
            },
        )
        .unwrap();

        let scope_dir = tmp.path().join("scope");
        std::fs::create_dir_all(&scope_dir).unwrap();

        let result = uninstall(
            &source,
            &scope_dir,
            &["alpha".to_string()],
            &UninstallOptions { group: None, force: false, dry_run: false },
        )
        .unwrap();
        assert_eq!(result.removed, vec!["alpha".to_string()]);
        assert!(!skill_dir.exists());
        let registry = crate::registry::load(&scope_dir).unwrap();
        assert!(registry.skills.is_empty());
        unsafe {
            std::env::remove_var("XDG_DATA_HOME");
        }
    }
}
