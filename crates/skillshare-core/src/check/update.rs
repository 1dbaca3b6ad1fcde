//! §4.6's `update` half: pulls tracked repos and reinstalls regular
//! skills, gated by the audit scanner with rollback on failure.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::Status;
use crate::audit::Severity;
use crate::discovery::{DiscoveryResult, TrackedRepo, discover};
use crate::git::GitAdapter;
use crate::install::installer::{self, InstallOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Updated,
    Unchanged,
    RolledBack,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateItem {
    pub name: String,
    pub outcome: Outcome,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateReport {
    pub items: Vec<UpdateItem>,
}

impl UpdateReport {
    pub fn any_rolled_back(&self) -> bool {
        self.items.iter().any(|i| i.outcome == Outcome::RolledBack)
    }
}

pub struct UpdateOptions {
    pub audit_threshold: Severity,
    pub skip_audit: bool,
    pub dry_run: bool,
}

/// Pull every tracked repo that is behind and not dirty; reinstall
/// every regular skill marked `update_available` by [`super::run_check`].
pub fn run_update(
    source_root: &Path,
    discovery: &DiscoveryResult,
    tracked: &[TrackedRepo],
    group_filter: Option<&str>,
    opts: &UpdateOptions,
) -> Result<UpdateReport> {
    let checked = super::run_check(discovery, tracked, group_filter);
    let mut items = Vec::new();

    for item in &checked.items {
        let Some(repo) = tracked.iter().find(|r| r.name == item.name) else {
            continue;
        };
        items.push(update_tracked_repo(repo, item.status, opts)?);
    }

    for entry in &discovery.entries {
        let name = entry.skill.name();
        let Some(check_item) = checked.items.iter().find(|i| i.name == name && i.group == entry.skill.group()) else {
            continue;
        };
        if check_item.status != Status::UpdateAvailable {
            continue;
        }
        let Some(meta) = &entry.metadata else {
            continue;
        };
        items.push(reinstall_skill(source_root, entry, meta, opts)?);
    }

    Ok(UpdateReport { items })
}

fn update_tracked_repo(repo: &TrackedRepo, status: Status, opts: &UpdateOptions) -> Result<UpdateItem> {
    if status != Status::Behind {
        return Ok(UpdateItem {
            name: repo.name.clone(),
            outcome: Outcome::Unchanged,
            detail: None,
        });
    }
    if opts.dry_run {
        return Ok(UpdateItem {
            name: repo.name.clone(),
            outcome: Outcome::Updated,
            detail: Some("dry-run".to_string()),
        });
    }

    let pre_head = GitAdapter::current_head(&repo.abs_path)?;
    let pull = GitAdapter::pull(&repo.abs_path)?;
    if !pull.ok() {
        anyhow::bail!("git pull failed for {}: {}", repo.name, pull.stderr.trim());
    }

    if opts.skip_audit {
        return Ok(UpdateItem {
            name: repo.name.clone(),
            outcome: Outcome::Updated,
            detail: None,
        });
    }

    let report = crate::audit::scan_tree(&repo.abs_path, &repo.name)?;
    if report.blocks(opts.audit_threshold) {
        GitAdapter::reset_hard(&repo.abs_path, &pre_head)?;
        return Ok(UpdateItem {
            name: repo.name.clone(),
            outcome: Outcome::RolledBack,
            detail: report.max_severity().map(|s| format!("audit blocked at {s}")),
        });
    }

    Ok(UpdateItem {
        name: repo.name.clone(),
        outcome: Outcome::Updated,
        detail: None,
    })
}

fn reinstall_skill(
    source_root: &Path,
    entry: &crate::discovery::DiscoveryEntry,
    meta: &crate::skill::SkillMetadata,
    opts: &UpdateOptions,
) -> Result<UpdateItem> {
    let name = entry.skill.name();
    if opts.dry_run {
        return Ok(UpdateItem {
            name,
            outcome: Outcome::Updated,
            detail: Some("dry-run".to_string()),
        });
    }

    let source = crate::source::parser::parse(&meta.source).with_context(|| format!("reparsing recorded source for {name}"))?;

    let staging = tempfile::tempdir().context("creating staging dir for reinstall")?;
    let staged_dest = staging.path().join(entry.skill.flat_name());

    let install_opts = InstallOptions {
        track: false,
        name_override: None,
        skip_audit: true,
        dry_run: false,
    };
    installer::install(&source, &staged_dest, &install_opts)?;

    if !opts.skip_audit {
        let report = crate::audit::scan_tree(&staged_dest, &name)?;
        if report.blocks(opts.audit_threshold) {
            return Ok(UpdateItem {
                name,
                outcome: Outcome::RolledBack,
                detail: report.max_severity().map(|s| format!("audit blocked at {s}, reinstall discarded")),
            });
        }
    }

    let live_dest = source_root.join(&entry.skill.rel_path);
    crate::fs::atomic::replace_dir_atomic(&live_dest, |dest| {
        crate::fs::copy::copy_tree(&staged_dest, dest)
    })?;

    Ok(UpdateItem {
        name,
        outcome: Outcome::Updated,
        detail: None,
    })
}

/// Reuse the fully-discovered tree plus tracked repos to decide whether
/// anything needs updating at all, without pulling or reinstalling.
pub fn dry_run_summary(source_root: &Path, group_filter: Option<&str>) -> Result<super::CheckReport> {
    let discovery = discover(source_root)?;
    let tracked = crate::discovery::tracked_repos(source_root)?;
    Ok(super::run_check(&discovery, &tracked, group_filter))
}
