//! §4.3 install strategies, dispatched on [`SourceType`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;

use crate::error::SkillshareError;
use crate::fs::copy::copy_tree;
use crate::git::{CloneOptions, GitAdapter, adapter::url_cache_key};
use crate::skill::{SkillMetadata, validate_name};
use crate::source::Source;
use crate::types::SourceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallAction {
    Cloned,
    ClonedAndExtracted,
    Copied,
    Tracked,
}

#[derive(Debug, Clone)]
pub struct InstallResult {
    pub action: InstallAction,
    pub tree_hash: Option<String>,
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub track: bool,
    pub name_override: Option<String>,
    pub skip_audit: bool,
    pub dry_run: bool,
}

/// Install `source` into `dest_path` (the final skill or tracked-repo
/// directory beneath the source root). Writes `.skillshare-meta.json`
/// on success.
pub fn install(source: &Source, dest_path: &Path, opts: &InstallOptions) -> Result<InstallResult> {
    if opts.dry_run {
        return Ok(InstallResult {
            action: InstallAction::Copied,
            tree_hash: None,
            commit: None,
        });
    }

    if opts.track {
        return install_tracked(source, dest_path);
    }

    let result = match source.kind {
        SourceType::LocalPath => install_local(source, dest_path)?,
        _ if source.subdir.is_empty() => install_full_clone(source, dest_path)?,
        _ => install_subdir(source, dest_path)?,
    };

    write_metadata(source, dest_path, &result)?;
    Ok(result)
}

fn write_metadata(source: &Source, dest_path: &Path, result: &InstallResult) -> Result<()> {
    let meta = SkillMetadata {
        source: source.canonical(),
        kind: source.kind,
        repo_url: source.kind.is_git().then(|| source.clone_url.clone()),
        version: result.commit.clone(),
        tree_hash: result.tree_hash.clone(),
        subdir: (!source.subdir.is_empty()).then(|| source.subdir.clone()),
        installed_at: Utc::now(),
    };
    crate::skill::metadata::write(&dest_path.join(crate::skill::META_FILE), &meta)
}

fn install_local(source: &Source, dest_path: &Path) -> Result<InstallResult> {
    let src_root = Path::new(&source.clone_url);
    let src = if source.subdir.is_empty() {
        src_root.to_path_buf()
    } else {
        src_root.join(&source.subdir)
    };
    if !src.is_dir() {
        bail!(SkillshareError::SubdirNotFound {
            clone_url: source.clone_url.clone(),
            subdir: source.subdir.clone(),
        });
    }
    copy_tree(&src, dest_path)?;
    Ok(InstallResult {
        action: InstallAction::Copied,
        tree_hash: None,
        commit: None,
    })
}

fn install_full_clone(source: &Source, dest_path: &Path) -> Result<InstallResult> {
    let out = GitAdapter::clone(&source.clone_url, dest_path, &CloneOptions::default())?;
    if !out.ok() {
        bail!(SkillshareError::Clone {
            kind: out.error_kind(),
            message: out.stderr,
        });
    }
    let commit = GitAdapter::current_head(dest_path)?;
    let tree_hash = GitAdapter::tree_hash_of_subdir(dest_path, "HEAD", "")?;
    Ok(InstallResult {
        action: InstallAction::Cloned,
        tree_hash,
        commit: Some(commit),
    })
}

fn install_tracked(source: &Source, dest_path: &Path) -> Result<InstallResult> {
    let name = dest_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    validate_name(&name)?;
    if !name.starts_with('_') {
        bail!(SkillshareError::InvalidName {
            name,
            reason: "tracked repos must have a '_' prefix".to_string(),
        });
    }
    let mut result = install_full_clone(source, dest_path)?;
    result.action = InstallAction::Tracked;
    write_metadata(source, dest_path, &result)?;
    Ok(result)
}

/// Git + subdir install: try the cheap blobless-fetch + sparse-checkout
/// path first; on an unsupported/auth failure, fall back to a full
/// clone with `ls-tree` subdir location and fuzzy basename matching.
fn install_subdir(source: &Source, dest_path: &Path) -> Result<InstallResult> {
    match install_subdir_via_sparse_checkout(source, dest_path) {
        Ok(result) => Ok(result),
        Err(e) => {
            tracing::warn!(error = %e, "blobless subdir fetch failed, falling back to full clone");
            install_subdir_via_full_clone(source, dest_path)
        }
    }
}

fn install_subdir_via_sparse_checkout(source: &Source, dest_path: &Path) -> Result<InstallResult> {
    let cache_key = url_cache_key(&source.clone_url);
    let bare_dir = crate::config::paths::cache_dir()
        .join("skillshare")
        .join("mirrors")
        .join(&cache_key);
    if bare_dir.exists() {
        std::fs::remove_dir_all(&bare_dir)?;
    }
    let out = GitAdapter::blobless_fetch(&source.clone_url, &bare_dir)?;
    if !out.ok() {
        bail!(SkillshareError::Clone {
            kind: out.error_kind(),
            message: out.stderr,
        });
    }

    let worktree_dir = bare_dir.with_extension("worktree");
    if worktree_dir.exists() {
        std::fs::remove_dir_all(&worktree_dir)?;
    }
    let out = GitAdapter::worktree_add_detached(&bare_dir, &worktree_dir, "FETCH_HEAD")?;
    if !out.ok() {
        bail!(SkillshareError::Clone {
            kind: out.error_kind(),
            message: out.stderr,
        });
    }
    let out = GitAdapter::sparse_checkout_set(&worktree_dir, &source.subdir)?;
    if !out.ok() {
        bail!(SkillshareError::Clone {
            kind: out.error_kind(),
            message: out.stderr,
        });
    }

    let subdir_path = worktree_dir.join(&source.subdir);
    if !subdir_path.is_dir() {
        bail!(SkillshareError::SubdirNotFound {
            clone_url: source.clone_url.clone(),
            subdir: source.subdir.clone(),
        });
    }

    let commit = GitAdapter::current_head(&worktree_dir)?;
    let tree_hash = GitAdapter::tree_hash_of_subdir(&worktree_dir, "HEAD", &source.subdir)?;
    copy_tree(&subdir_path, dest_path)?;

    let _ = std::fs::remove_dir_all(&worktree_dir);
    let _ = std::fs::remove_dir_all(&bare_dir);

    Ok(InstallResult {
        action: InstallAction::ClonedAndExtracted,
        tree_hash,
        commit: Some(commit),
    })
}

fn install_subdir_via_full_clone(source: &Source, dest_path: &Path) -> Result<InstallResult> {
    let tmp = tempfile::tempdir().context("creating temp dir for fallback clone")?;
    let clone_dest = tmp.path().join("clone");
    let out = GitAdapter::clone(&source.clone_url, &clone_dest, &CloneOptions::default())?;
    if !out.ok() {
        bail!(SkillshareError::Clone {
            kind: out.error_kind(),
            message: out.stderr,
        });
    }

    let exact = clone_dest.join(&source.subdir);
    let resolved_subdir = if exact.is_dir() {
        source.subdir.clone()
    } else {
        fuzzy_find_subdir(&clone_dest, &source.subdir)?
    };

    let commit = GitAdapter::current_head(&clone_dest)?;
    let tree_hash = GitAdapter::tree_hash_of_subdir(&clone_dest, "HEAD", &resolved_subdir)?;
    copy_tree(&clone_dest.join(&resolved_subdir), dest_path)?;

    Ok(InstallResult {
        action: InstallAction::ClonedAndExtracted,
        tree_hash,
        commit: Some(commit),
    })
}

/// Search the clone for any directory whose basename matches the
/// requested subdir's basename. The deepest unique match wins; multiple
/// matches at the same maximum depth, or none at all, is a failure.
fn fuzzy_find_subdir(clone_dest: &Path, requested_subdir: &str) -> Result<String> {
    let basename = Path::new(requested_subdir)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| requested_subdir.to_string());

    let mut candidates: Vec<(usize, PathBuf)> = Vec::new();
    for entry in walkdir::WalkDir::new(clone_dest).min_depth(1) {
        let entry = entry?;
        if entry.file_type().is_dir()
            && entry.file_name().to_string_lossy() == basename
            && entry.path().file_name().map(|n| n != ".git").unwrap_or(true)
        {
            candidates.push((entry.depth(), entry.path().to_path_buf()));
        }
    }

    let Some(max_depth) = candidates.iter().map(|(d, _)| *d).max() else {
        bail!(SkillshareError::SubdirNotFound {
            clone_url: clone_dest.to_string_lossy().into_owned(),
            subdir: requested_subdir.to_string(),
        });
    };
    let deepest: Vec<_> = candidates.into_iter().filter(|(d, _)| *d == max_depth).collect();
    if deepest.len() != 1 {
        bail!(SkillshareError::SubdirNotFound {
            clone_url: clone_dest.to_string_lossy().into_owned(),
            subdir: requested_subdir.to_string(),
        });
    }
    let rel = deepest[0]
        .1
        .strip_prefix(clone_dest)
        .unwrap()
        .to_string_lossy()
        .into_owned();
    Ok(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceType;

    fn init_repo(dir: &Path) {
        std::process::Command::new("git").arg("init").arg("-q").current_dir(dir).status().unwrap();
        std::process::Command::new("git").args(["config", "user.email", "t@example.com"]).current_dir(dir).status().unwrap();
        std::process::Command::new("git").args(["config", "user.name", "t"]).current_dir(dir).status().unwrap();
    }

    fn commit_all(dir: &Path, msg: &str) {
        std::process::Command::new("git").args(["add", "-A"]).current_dir(dir).status().unwrap();
        std::process::Command::new("git").args(["commit", "-q", "-m", msg]).current_dir(dir).status().unwrap();
    }

    #[test]
    fn local_path_install_copies_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src/alpha");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("SKILL.md"), "# alpha").unwrap();

        let source = Source {
            kind: SourceType::LocalPath,
            clone_url: tmp.path().join("src").to_string_lossy().into_owned(),
            subdir: String::new(),
            name: "alpha".to_string(),
            raw: "".to_string(),
        };
        let dest = tmp.path().join("dest/alpha");
        let result = install(&source, &dest, &InstallOptions { name_override: Some("alpha".into()), ..Default::default() }).unwrap();
        assert_eq!(result.action, InstallAction::Copied);
        assert_eq!(std::fs::read_to_string(dest.join("alpha/SKILL.md")).unwrap(), "# alpha");
    }

    #[test]
    fn file_url_subdir_install_extracts_only_requested_subdir() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = tmp.path().join("repo");
        std::fs::create_dir_all(repo.join("skills/alpha")).unwrap();
        std::fs::write(repo.join("skills/alpha/SKILL.md"), "# alpha").unwrap();
        std::fs::create_dir_all(repo.join("other")).unwrap();
        std::fs::write(repo.join("other/ignored.txt"), "x").unwrap();
        init_repo(&repo);
        commit_all(&repo, "init");

        let raw = format!("file://{}//skills/alpha", repo.display());
        let source = crate::source::parse(&raw).unwrap();
        let dest = tmp.path().join("dest/alpha");
        let result = install(&source, &dest, &InstallOptions::default()).unwrap();
        assert_eq!(result.action, InstallAction::ClonedAndExtracted);
        assert_eq!(std::fs::read_to_string(dest.join("SKILL.md")).unwrap(), "# alpha");
        assert!(!dest.join("ignored.txt").exists());
    }
}
