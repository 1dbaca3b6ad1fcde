//! §4.10 — snapshot target directories into timestamped trees, and
//! restore them selectively.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};

use crate::fs::symlink;

#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct SnapshotResult {
    pub timestamp: String,
    pub targets_backed_up: Vec<String>,
}

/// ISO-8601-ish timestamp used as the directory name; colons are not
/// filesystem-safe so this uses `%Y%m%dT%H%M%SZ`.
fn timestamp_dir_name(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Copy every real (non-symlink) directory under each named target into
/// `$XDG_DATA_HOME/skillshare/backups/<timestamp>/<target>/`. Symlinks
/// are skipped — they're redundant given the source tree.
pub fn snapshot(targets: &[(String, PathBuf)], now: DateTime<Utc>, opts: &BackupOptions) -> Result<SnapshotResult> {
    let ts = timestamp_dir_name(now);
    let backup_root = crate::config::paths::backups_dir().join(&ts);
    let mut backed_up = Vec::new();

    for (name, path) in targets {
        if !path.is_dir() {
            continue;
        }
        let dest = backup_root.join(name);
        if opts.dry_run {
            backed_up.push(name.clone());
            continue;
        }
        copy_non_symlinks(path, &dest)?;
        backed_up.push(name.clone());
    }

    Ok(SnapshotResult {
        timestamp: ts,
        targets_backed_up: backed_up,
    })
}

fn copy_non_symlinks(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;
    for entry in std::fs::read_dir(src).with_context(|| format!("reading {}", src.display()))? {
        let entry = entry?;
        let src_path = entry.path();
        if symlink::is_symlink(&src_path) {
            continue;
        }
        let dest_path = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_non_symlinks(&src_path, &dest_path)?;
        } else {
            std::fs::copy(&src_path, &dest_path)
                .with_context(|| format!("copying {} to {}", src_path.display(), dest_path.display()))?;
        }
    }
    Ok(())
}

/// Remove backup timestamp directories older than `retention_days`
/// (default 30).
pub fn cleanup(retention_days: i64, now: DateTime<Utc>, dry_run: bool) -> Result<Vec<String>> {
    let root = crate::config::paths::backups_dir();
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let cutoff = now - chrono::Duration::days(retention_days);
    let mut removed = Vec::new();

    for entry in std::fs::read_dir(&root).with_context(|| format!("reading {}", root.display()))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(parsed) = DateTime::parse_from_str(&format!("{name}+0000"), "%Y%m%dT%H%M%SZ%z") else {
            continue;
        };
        if parsed.with_timezone(&Utc) < cutoff {
            if !dry_run {
                std::fs::remove_dir_all(entry.path())?;
            }
            removed.push(name);
        }
    }
    Ok(removed)
}

/// List available backup timestamps, newest first.
pub fn list_timestamps() -> Result<Vec<String>> {
    let root = crate::config::paths::backups_dir();
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = std::fs::read_dir(&root)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names.reverse();
    Ok(names)
}

/// Restore `target_name` from a backup. `from` selects a specific
/// timestamp; `None` picks the newest. Restoring into a non-empty
/// target requires `force`.
pub fn restore(target_name: &str, target_path: &Path, from: Option<&str>, force: bool, dry_run: bool) -> Result<String> {
    let ts = match from {
        Some(ts) => ts.to_string(),
        None => list_timestamps()?.into_iter().next().context("no backups available")?,
    };
    let src = crate::config::paths::backups_dir().join(&ts).join(target_name);
    if !src.is_dir() {
        bail!("no backup of target {target_name:?} at timestamp {ts}");
    }

    let non_empty = target_path.is_dir() && std::fs::read_dir(target_path).map(|mut d| d.next().is_some()).unwrap_or(false);
    if non_empty && !force {
        bail!(
            "target {target_name:?} is not empty; pass --force to overwrite with the backup from {ts}"
        );
    }

    if !dry_run {
        crate::fs::atomic::replace_dir_atomic(target_path, |staging| copy_non_symlinks(&src, staging))?;
    }
    Ok(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_skips_symlinks_and_copies_real_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        unsafe {
            std::env::set_var("XDG_DATA_HOME", tmp.path().join("data"));
        }
        let target = tmp.path().join("target");
        std::fs::create_dir_all(target.join("real")).unwrap();
        std::fs::write(target.join("real/f.txt"), "x").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(tmp.path(), target.join("linked")).unwrap();

        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let result = snapshot(&[("claude-code".to_string(), target.clone())], now, &BackupOptions { dry_run: false }).unwrap();
        assert_eq!(result.targets_backed_up, vec!["claude-code".to_string()]);

        let backed_up_path = crate::config::paths::backups_dir().join(&result.timestamp).join("claude-code");
        assert!(backed_up_path.join("real/f.txt").exists());
        assert!(!backed_up_path.join("linked").exists());
        unsafe {
            std::env::remove_var("XDG_DATA_HOME");
        }
    }

    #[test]
    fn restore_into_nonempty_target_requires_force() {
        let tmp = tempfile::tempdir().unwrap();
        unsafe {
            std::env::set_var("XDG_DATA_HOME", tmp.path().join("data"));
        }
        let backup_dir = crate::config::paths::backups_dir().join("20260101T000000Z").join("claude-code");
        std::fs::create_dir_all(&backup_dir).unwrap();
        std::fs::write(backup_dir.join("f.txt"), "x").unwrap();

        let target = tmp.path().join("target");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("existing.txt"), "y").unwrap();

        let err = restore("claude-code", &target, Some("20260101T000000Z"), false, false).unwrap_err();
        assert!(err.to_string().contains("--force"));

        restore("claude-code", &target, Some("20260101T000000Z"), true, false).unwrap();
        assert!(target.join("f.txt").exists());
        unsafe {
            std::env::remove_var("XDG_DATA_HOME");
        }
    }
}
