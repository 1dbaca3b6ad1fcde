//! §4.6 — compares local metadata against remote tree hashes and
//! tracked-repo pull state.

pub mod update;

use serde::Serialize;

use crate::discovery::{DiscoveryResult, TrackedRepo};
use crate::git::GitAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    UpToDate,
    UpdateAvailable,
    Stale,
    Dirty,
    Behind,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckItem {
    pub name: String,
    pub group: String,
    pub status: Status,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub items: Vec<CheckItem>,
}

/// Fetch the remote tree for `repo_url` and resolve `subdir`'s tree
/// hash plus the remote HEAD commit. Uses a throwaway bare mirror under
/// the cache dir, concurrency bounded by the caller.
fn remote_probe(repo_url: &str, subdir: &str) -> anyhow::Result<(Option<String>, String)> {
    let cache_key = crate::git::adapter::url_cache_key(repo_url);
    let bare_dir = crate::config::paths::cache_dir()
        .join("skillshare")
        .join("probes")
        .join(&cache_key);
    if bare_dir.exists() {
        std::fs::remove_dir_all(&bare_dir)?;
    }
    let out = GitAdapter::blobless_fetch(repo_url, &bare_dir)?;
    if !out.ok() {
        anyhow::bail!("remote probe failed: {}", out.stderr.trim());
    }
    let commit = GitAdapter::run_rev_parse_fetch_head(&bare_dir)?;
    let tree_hash = GitAdapter::tree_hash_of_subdir(&bare_dir, "FETCH_HEAD", subdir)?;
    let _ = std::fs::remove_dir_all(&bare_dir);
    Ok((tree_hash, commit))
}

pub fn run_check(discovery: &DiscoveryResult, tracked: &[TrackedRepo], group_filter: Option<&str>) -> CheckReport {
    let skill_checks: Vec<_> = discovery
        .entries
        .iter()
        .filter(|e| e.metadata.as_ref().and_then(|m| m.repo_url.clone()).is_some())
        .filter(|e| group_filter.map(|g| e.skill.group() == g).unwrap_or(true))
        .collect();

    let results = crate::concurrency::run_bounded(
        skill_checks,
        crate::concurrency::DEFAULT_WORKERS,
        |entry| {
            let meta = entry.metadata.as_ref().unwrap();
            let repo_url = meta.repo_url.clone().unwrap();
            let subdir = meta.subdir.clone().unwrap_or_default();
            let status = match remote_probe(&repo_url, &subdir) {
                Ok((Some(remote_tree), _)) => match &meta.tree_hash {
                    Some(local_tree) if *local_tree == remote_tree => Status::UpToDate,
                    Some(_) => Status::UpdateAvailable,
                    None => Status::UpdateAvailable,
                },
                Ok((None, remote_commit)) => Status::Stale.with_commit_fallback(&meta.tree_hash, &meta.version, &remote_commit),
                Err(_) => Status::Stale,
            };
            CheckItem {
                name: entry.skill.name(),
                group: entry.skill.group(),
                status,
            }
        },
    );

    let mut items = results;

    for repo in tracked {
        if group_filter.is_some() {
            continue;
        }
        let status = match crate::git::GitAdapter::is_dirty(&repo.abs_path) {
            Ok(true) => Status::Dirty,
            Ok(false) => match crate::git::GitAdapter::behind_count(&repo.abs_path) {
                Ok(0) => Status::UpToDate,
                Ok(_) => Status::Behind,
                Err(_) => Status::UpToDate,
            },
            Err(_) => Status::UpToDate,
        };
        items.push(CheckItem {
            name: repo.name.clone(),
            group: String::new(),
            status,
        });
    }

    CheckReport { items }
}

impl Status {
    /// When the remote tree has no entry for this subdir at all, that's
    /// `stale` outright (§4.6's outcome table) — but we still want to
    /// allow a legacy commit-hash fallback to short-circuit to
    /// `up_to_date` when tree_hash isn't recorded and commit matches.
    fn with_commit_fallback(self, tree_hash: &Option<String>, local_commit: &Option<String>, remote_commit: &str) -> Status {
        if tree_hash.is_none() {
            if let Some(local) = local_commit {
                if local == remote_commit {
                    return Status::UpToDate;
                }
            }
        }
        self
    }
}
