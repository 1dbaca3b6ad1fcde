//! Walks a source tree and builds the in-memory skill index, backed by
//! an L1 (in-process) and L2 (on-disk) cache.

pub mod cache;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use anyhow::{Context, Result};

use crate::skill::{META_FILE, SKILL_FILE, Skill, SkillMetadata};

/// Lightweight listing: name + path only, no metadata read.
#[derive(Debug, Clone)]
pub struct SkillListing {
    pub skill: Skill,
}

/// Full discovery result: skills plus their metadata, if present.
#[derive(Debug, Clone)]
pub struct DiscoveryEntry {
    pub skill: Skill,
    pub metadata: Option<SkillMetadata>,
}

#[derive(Debug, Default)]
pub struct DiscoveryResult {
    pub entries: Vec<DiscoveryEntry>,
}

impl DiscoveryResult {
    pub fn skills(&self) -> impl Iterator<Item = &Skill> {
        self.entries.iter().map(|e| &e.skill)
    }

    pub fn tracked_repo_roots(&self) -> Vec<&Skill> {
        // Tracked repos aren't skills themselves (no SKILL.md required at
        // their root); callers enumerate them separately via
        // `tracked_repos`.
        Vec::new()
    }
}

/// A tracked repo: a full git clone under the source root, `_`-prefixed.
#[derive(Debug, Clone)]
pub struct TrackedRepo {
    pub name: String,
    pub abs_path: PathBuf,
}

fn is_skill_dir(dir: &Path) -> bool {
    dir.join(SKILL_FILE).is_file()
}

/// Depth-first walk identifying every directory containing `SKILL.md`
/// directly. Hidden directories and tracked-repo roots are descended
/// into regardless.
fn walk_skills(root: &Path) -> Result<Vec<Skill>> {
    let mut skills = Vec::new();
    // walkdir descends into hidden directories by default, which is
    // required here: `.curated/`/`.system/` inside tracked repos carry
    // skills and must not be skipped.
    let walker = walkdir::WalkDir::new(root).min_depth(1).into_iter();

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if is_skill_dir(entry.path()) {
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path()).to_path_buf();
            skills.push(Skill {
                rel_path: rel,
                abs_path: entry.path().to_path_buf(),
            });
        }
    }
    Ok(skills)
}

/// List tracked repos directly beneath the source root.
pub fn tracked_repos(root: &Path) -> Result<Vec<TrackedRepo>> {
    let mut repos = Vec::new();
    if !root.is_dir() {
        return Ok(repos);
    }
    for entry in std::fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('_') && entry.file_type()?.is_dir() {
            repos.push(TrackedRepo {
                name,
                abs_path: entry.path(),
            });
        }
    }
    repos.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(repos)
}

static L1: OnceLock<Mutex<Option<(PathBuf, std::time::SystemTime, Vec<Skill>)>>> = OnceLock::new();

fn l1_lookup(root: &Path, root_mtime: std::time::SystemTime) -> Option<Vec<Skill>> {
    let cell = L1.get_or_init(|| Mutex::new(None));
    let guard = cell.lock().unwrap();
    match &*guard {
        Some((cached_root, cached_mtime, skills))
            if cached_root == root && *cached_mtime == root_mtime =>
        {
            Some(skills.clone())
        }
        _ => None,
    }
}

fn l1_store(root: &Path, root_mtime: std::time::SystemTime, skills: Vec<Skill>) {
    let cell = L1.get_or_init(|| Mutex::new(None));
    let mut guard = cell.lock().unwrap();
    *guard = Some((root.to_path_buf(), root_mtime, skills));
}

/// Name + path only, skipping metadata reads. Used by `list` and
/// `cache list`.
pub fn discover_lite(root: &Path) -> Result<Vec<SkillListing>> {
    let root_mtime = std::fs::metadata(root)
        .with_context(|| format!("stat {}", root.display()))?
        .modified()?;
    let skills = match l1_lookup(root, root_mtime) {
        Some(s) => s,
        None => {
            let s = walk_skills(root)?;
            l1_store(root, root_mtime, s.clone());
            s
        }
    };
    Ok(skills.into_iter().map(|skill| SkillListing { skill }).collect())
}

/// Full discovery: reads per-skill metadata and refreshes the L2 cache.
pub fn discover(root: &Path) -> Result<DiscoveryResult> {
    if let Some(cached) = cache::load(root)? {
        return Ok(cached);
    }

    let skills = walk_skills(root)?;
    let mut entries = Vec::with_capacity(skills.len());
    for skill in skills {
        let metadata = skill.metadata()?;
        entries.push(DiscoveryEntry { skill, metadata });
    }
    let result = DiscoveryResult { entries };
    cache::store(root, &result)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_skill_with_nested_and_hidden_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("_repo/.curated/skills/alpha")).unwrap();
        std::fs::write(root.join("_repo/.curated/skills/alpha/SKILL.md"), "# a").unwrap();
        std::fs::create_dir_all(root.join("top")).unwrap();
        std::fs::write(root.join("top/SKILL.md"), "# top").unwrap();

        let found = walk_skills(root).unwrap();
        let rels: Vec<_> = found.iter().map(|s| s.rel_path.to_string_lossy().into_owned()).collect();
        assert!(rels.iter().any(|r| r.contains("_repo") && r.contains("alpha")));
        assert!(rels.contains(&"top".to_string()));
    }

    #[test]
    fn tracked_repos_lists_underscore_prefixed_dirs_only() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("_tracked")).unwrap();
        std::fs::create_dir_all(tmp.path().join("normal")).unwrap();
        let repos = tracked_repos(tmp.path()).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "_tracked");
    }
}
