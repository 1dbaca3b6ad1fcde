//! §4.5 — the three-mode materializer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::error::SkillshareError;
use crate::fs::{checksum_tree, flat_name, newest_mtime, symlink};
use crate::skill::Skill;
use crate::types::LinkMode;

use super::manifest::{self, Manifest, SYMLINK_SENTINEL};
use super::target::{Target, affinity_matches};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Merged,
    Updated,
    Skipped,
    Pruned,
    FullySynced,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncItem {
    pub target: String,
    pub skill: String,
    pub verb: Verb,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub items: Vec<SyncItem>,
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub force: bool,
    pub target_filter: Option<String>,
}

/// A skill plus the `targets:` affinity declared in its front matter, if
/// any — resolved once up front so the engine doesn't re-parse
/// `SKILL.md` per target.
pub struct SyncSkill {
    pub skill: Skill,
    pub targets: Option<Vec<String>>,
}

pub fn sync(source_root: &Path, skills: &[SyncSkill], targets: &[Target], opts: &SyncOptions) -> Result<SyncReport> {
    for t in targets {
        t.validate_patterns()?;
    }

    let selected: Vec<&Target> = targets
        .iter()
        .filter(|t| opts.target_filter.as_deref().map(|f| f == t.name).unwrap_or(true))
        .collect();

    let mut groups: BTreeMap<PathBuf, Vec<&Target>> = BTreeMap::new();
    for t in &selected {
        let key = resolved_path_key(&t.path);
        groups.entry(key).or_default().push(t);
    }

    let group_vecs: Vec<Vec<&Target>> = groups.into_values().collect();
    let results: Vec<Result<Vec<SyncItem>>> = crate::concurrency::run_bounded(
        group_vecs,
        crate::concurrency::DEFAULT_WORKERS,
        |group| sync_group(source_root, skills, &group, opts),
    );

    let mut report = SyncReport::default();
    for r in results {
        report.items.extend(r?);
    }
    Ok(report)
}

fn resolved_path_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Targets sharing a resolved path are processed sequentially, one
/// worker owning the whole group (§5's shared-path serialization).
fn sync_group(source_root: &Path, skills: &[SyncSkill], group: &[&Target], opts: &SyncOptions) -> Result<Vec<SyncItem>> {
    let mut items = Vec::new();
    for target in group {
        items.extend(sync_one_target(source_root, skills, target, opts)?);
    }
    Ok(items)
}

fn qualifying_skills<'a>(skills: &'a [SyncSkill], target: &Target) -> Result<Vec<&'a SyncSkill>> {
    let mut out = Vec::new();
    for s in skills {
        if !target.filter_allows(&s.skill.name())? {
            continue;
        }
        if let Some(declared) = &s.targets {
            if !declared.iter().any(|d| affinity_matches(d, &target.name)) {
                continue;
            }
        }
        out.push(s);
    }
    Ok(out)
}

fn sync_one_target(source_root: &Path, skills: &[SyncSkill], target: &Target, opts: &SyncOptions) -> Result<Vec<SyncItem>> {
    let qualifying = qualifying_skills(skills, target)?;
    let expected: HashMap<String, &SyncSkill> =
        qualifying.iter().map(|s| (s.skill.flat_name(), *s)).collect();

    match target.mode {
        LinkMode::Symlink => sync_whole_dir_symlink(source_root, target, opts),
        LinkMode::Merge => sync_merge(source_root, target, &expected, opts),
        LinkMode::Copy => sync_copy(source_root, target, &expected, opts),
    }
}

fn sync_whole_dir_symlink(source_root: &Path, target: &Target, opts: &SyncOptions) -> Result<Vec<SyncItem>> {
    let already_matching = symlink::is_symlink(&target.path)
        && symlink::read(&target.path).ok().as_deref() == Some(source_root);

    if target.path.exists() && !already_matching && !opts.force {
        bail!(SkillshareError::ConflictingTarget {
            name: target.name.clone(),
            path: target.path.clone(),
        });
    }

    if opts.dry_run {
        return Ok(vec![SyncItem {
            target: target.name.clone(),
            skill: "*".to_string(),
            verb: Verb::FullySynced,
        }]);
    }

    if !already_matching {
        if target.path.exists() || symlink::is_symlink(&target.path) {
            remove_entry(&target.path)?;
        }
        if let Some(parent) = target.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        symlink::create(source_root, &target.path)?;
    }
    manifest::remove(&target.path)?;

    Ok(vec![SyncItem {
        target: target.name.clone(),
        skill: "*".to_string(),
        verb: Verb::FullySynced,
    }])
}

fn remove_entry(path: &Path) -> Result<()> {
    if symlink::is_symlink(path) {
        std::fs::remove_file(path).with_context(|| format!("removing symlink {}", path.display()))
    } else if path.is_dir() {
        std::fs::remove_dir_all(path).with_context(|| format!("removing directory {}", path.display()))
    } else if path.exists() {
        std::fs::remove_file(path).with_context(|| format!("removing file {}", path.display()))
    } else {
        Ok(())
    }
}

fn sync_merge(source_root: &Path, target: &Target, expected: &HashMap<String, &SyncSkill>, opts: &SyncOptions) -> Result<Vec<SyncItem>> {
    let mut items = Vec::new();

    // Converting *from* whole-dir symlink mode: replace with a real dir.
    if symlink::is_symlink(&target.path) {
        if !opts.force {
            bail!(SkillshareError::ConflictingTarget {
                name: target.name.clone(),
                path: target.path.clone(),
            });
        }
        if !opts.dry_run {
            remove_entry(&target.path)?;
        }
    }

    if !opts.dry_run {
        std::fs::create_dir_all(&target.path)?;
    }

    // Converting from copy mode: previously-managed copies become
    // symlinks; manifest entries are marked with the symlink sentinel.
    // The manifest only exists at all as a leftover from a prior
    // copy-mode sync — merge mode itself never persists one.
    let mut manifest = manifest::load(&target.path)?;
    let converting_from_copy = manifest.managed.values().any(|v| v != SYMLINK_SENTINEL);

    for (flat_name, sync_skill) in expected {
        let link_path = target.path.join(flat_name);
        let abs_skill_path = &sync_skill.skill.abs_path;

        if link_path.is_dir() && !symlink::is_symlink(&link_path) {
            let copy_managed = manifest.managed.get(flat_name).map(|v| v != SYMLINK_SENTINEL).unwrap_or(false);
            if copy_managed && opts.force {
                // copy -> merge conversion: replace the copied directory
                // with a symlink to the source skill.
                if !opts.dry_run {
                    remove_entry(&link_path)?;
                    symlink::create(abs_skill_path, &link_path)?;
                }
                manifest.managed.insert(flat_name.clone(), SYMLINK_SENTINEL.to_string());
                items.push(SyncItem {
                    target: target.name.clone(),
                    skill: flat_name.clone(),
                    verb: Verb::Updated,
                });
                continue;
            }
            // Local unmanaged directory with a colliding name: preserved
            // and warned, never overwritten.
            tracing::warn!(target = target.name, flat_name, "local directory collides with managed name, preserving");
            items.push(SyncItem {
                target: target.name.clone(),
                skill: flat_name.clone(),
                verb: Verb::Skipped,
            });
            continue;
        }

        let already_correct = symlink::is_symlink(&link_path)
            && symlink::read(&link_path).ok().as_deref() == Some(abs_skill_path.as_path());

        if already_correct {
            items.push(SyncItem {
                target: target.name.clone(),
                skill: flat_name.clone(),
                verb: Verb::Skipped,
            });
            continue;
        }

        if !opts.dry_run {
            if link_path.exists() || symlink::is_symlink(&link_path) {
                remove_entry(&link_path)?;
            }
            symlink::create(abs_skill_path, &link_path)?;
        }
        manifest.managed.insert(flat_name.clone(), SYMLINK_SENTINEL.to_string());
        items.push(SyncItem {
            target: target.name.clone(),
            skill: flat_name.clone(),
            verb: Verb::Merged,
        });
    }

    prune_target(source_root, target, expected.keys().cloned().collect(), opts, &mut manifest, &mut items)?;

    if !opts.dry_run && converting_from_copy {
        let fully_converted = manifest.managed.values().all(|v| v == SYMLINK_SENTINEL);
        if fully_converted {
            manifest::remove(&target.path)?;
        } else {
            manifest::save(&target.path, &manifest)?;
        }
    }

    Ok(items)
}

fn sync_copy(source_root: &Path, target: &Target, expected: &HashMap<String, &SyncSkill>, opts: &SyncOptions) -> Result<Vec<SyncItem>> {
    let mut items = Vec::new();

    if symlink::is_symlink(&target.path) {
        if !opts.force {
            bail!(SkillshareError::ConflictingTarget {
                name: target.name.clone(),
                path: target.path.clone(),
            });
        }
        if !opts.dry_run {
            remove_entry(&target.path)?;
        }
    }

    if !opts.dry_run {
        std::fs::create_dir_all(&target.path)?;
    }

    let mut manifest = manifest::load(&target.path)?;

    for (flat_name, sync_skill) in expected {
        let dest_path = target.path.join(flat_name);
        let src_path = &sync_skill.skill.abs_path;

        let recorded_checksum = manifest.managed.get(flat_name).cloned();
        let recorded_mtime = manifest.mtimes.get(flat_name).cloned();

        if !opts.force && dest_path.is_dir() && recorded_checksum.as_deref() != Some(SYMLINK_SENTINEL) {
            if let (Some(recorded_mtime), Ok(current_mtime)) = (recorded_mtime, newest_mtime(src_path)) {
                let current_secs = crate::fs::mtime::unix_seconds(current_mtime);
                if current_secs <= recorded_mtime {
                    items.push(SyncItem {
                        target: target.name.clone(),
                        skill: flat_name.clone(),
                        verb: Verb::Skipped,
                    });
                    continue;
                }
            }
        }

        let checksum = checksum_tree(src_path)?;
        if !opts.force && recorded_checksum.as_deref() == Some(checksum.as_str()) {
            if !opts.dry_run {
                if let Ok(mtime) = newest_mtime(src_path) {
                    manifest
                        .mtimes
                        .insert(flat_name.clone(), crate::fs::mtime::unix_seconds(mtime));
                }
            }
            items.push(SyncItem {
                target: target.name.clone(),
                skill: flat_name.clone(),
                verb: Verb::Skipped,
            });
            continue;
        }

        if !opts.dry_run {
            crate::fs::atomic::replace_dir_atomic(&dest_path, |staging| {
                crate::fs::copy::copy_tree(src_path, staging)
            })?;
            manifest.managed.insert(flat_name.clone(), checksum);
            if let Ok(mtime) = newest_mtime(src_path) {
                manifest
                    .mtimes
                    .insert(flat_name.clone(), crate::fs::mtime::unix_seconds(mtime));
            }
        }
        items.push(SyncItem {
            target: target.name.clone(),
            skill: flat_name.clone(),
            verb: Verb::Updated,
        });
    }

    prune_target(source_root, target, expected.keys().cloned().collect(), opts, &mut manifest, &mut items)?;

    // Remove manifest entries for names no longer present at all.
    let expected_names: HashSet<String> = expected.keys().cloned().collect();
    manifest.managed.retain(|k, _| expected_names.contains(k));
    manifest.mtimes.retain(|k, _| expected_names.contains(k));

    if !opts.dry_run {
        manifest::save(&target.path, &manifest)?;
    }

    Ok(items)
}

/// Remove any target entry whose flat name is not in `expected`,
/// subject to the pruning safeguards of §4.5. Mutates the caller's
/// manifest in place; the caller alone decides whether/how to persist it.
fn prune_target(
    source_root: &Path,
    target: &Target,
    expected: HashSet<String>,
    opts: &SyncOptions,
    manifest: &mut Manifest,
    items: &mut Vec<SyncItem>,
) -> Result<()> {
    if !target.path.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(&target.path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == super::manifest::MANIFEST_FILE || expected.contains(&name) {
            continue;
        }
        let path = entry.path();

        if symlink::is_broken(&path) {
            if !opts.dry_run {
                std::fs::remove_file(&path)?;
            }
            manifest.managed.remove(&name);
            items.push(SyncItem {
                target: target.name.clone(),
                skill: name,
                verb: Verb::Pruned,
            });
            continue;
        }

        if symlink::is_symlink(&path) {
            if symlink::resolves_under(&path, source_root) || opts.force {
                if !opts.dry_run {
                    std::fs::remove_file(&path)?;
                }
                manifest.managed.remove(&name);
                items.push(SyncItem {
                    target: target.name.clone(),
                    skill: name,
                    verb: Verb::Pruned,
                });
            }
            // Else: points outside source root, preserved without --force.
            continue;
        }

        if path.is_dir() {
            // Local non-symlink directory: always preserved.
            continue;
        }

        // Stray file with a managed-looking name but no symlink/dir: only
        // prune if it was previously managed by us (copy mode).
        if manifest.managed.contains_key(&name) {
            if !opts.dry_run {
                let _ = std::fs::remove_file(&path);
            }
            manifest.managed.remove(&name);
            items.push(SyncItem {
                target: target.name.clone(),
                skill: name,
                verb: Verb::Pruned,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_skill(tmp: &Path, rel: &str, content: &str) -> Skill {
        let abs = tmp.join(rel);
        std::fs::create_dir_all(&abs).unwrap();
        std::fs::write(abs.join("SKILL.md"), content).unwrap();
        Skill {
            rel_path: PathBuf::from(rel),
            abs_path: abs,
        }
    }

    #[test]
    fn merge_mode_creates_symlinks_for_each_skill() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        std::fs::create_dir_all(&source).unwrap();
        let skill = make_skill(&source, "alpha", "# alpha");

        let target = Target {
            name: "claude-code".to_string(),
            path: tmp.path().join("target"),
            mode: LinkMode::Merge,
            include: vec![],
            exclude: vec![],
        };
        let skills = vec![SyncSkill { skill, targets: None }];
        let report = sync(&source, &skills, std::slice::from_ref(&target), &SyncOptions::default()).unwrap();
        assert!(report.items.iter().any(|i| i.verb == Verb::Merged));
        assert!(symlink::is_symlink(&target.path.join("alpha")));
    }

    #[test]
    fn shared_path_targets_do_not_race() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        std::fs::create_dir_all(&source).unwrap();
        for i in 0..10 {
            make_skill(&source, &format!("skill-{i}"), "# x");
        }
        let shared = tmp.path().join("shared");
        let targets: Vec<Target> = (0..4)
            .map(|i| Target {
                name: format!("t{i}"),
                path: shared.clone(),
                mode: LinkMode::Merge,
                include: vec![],
                exclude: vec![],
            })
            .collect();
        let skills: Vec<SyncSkill> = (0..10)
            .map(|i| SyncSkill {
                skill: Skill {
                    rel_path: PathBuf::from(format!("skill-{i}")),
                    abs_path: source.join(format!("skill-{i}")),
                },
                targets: None,
            })
            .collect();
        let report = sync(&source, &skills, &targets, &SyncOptions::default()).unwrap();
        assert!(!report.items.is_empty());
        for i in 0..10 {
            assert!(symlink::is_symlink(&shared.join(format!("skill-{i}"))));
        }
    }

    #[test]
    fn copy_mode_idempotent_second_run_skips() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        std::fs::create_dir_all(&source).unwrap();
        let skill = make_skill(&source, "alpha", "# Original");

        let target = Target {
            name: "t".to_string(),
            path: tmp.path().join("target"),
            mode: LinkMode::Copy,
            include: vec![],
            exclude: vec![],
        };
        let skills = vec![SyncSkill { skill, targets: None }];
        let r1 = sync(&source, &skills, std::slice::from_ref(&target), &SyncOptions::default()).unwrap();
        assert!(r1.items.iter().any(|i| i.verb == Verb::Updated));

        let r2 = sync(&source, &skills, std::slice::from_ref(&target), &SyncOptions::default()).unwrap();
        assert!(r2.items.iter().all(|i| i.verb == Verb::Skipped));
    }
}
