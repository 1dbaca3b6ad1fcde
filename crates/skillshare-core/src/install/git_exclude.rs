//! Adds the source directory to `.git/info/exclude` when the project
//! root happens to be inside a git work tree, so a project-scope
//! `.skillshare/skills/` tree doesn't get committed by accident.

use std::path::Path;

use anyhow::{Context, Result};

pub fn ensure_excluded(project_root: &Path, rel_path: &Path) -> Result<()> {
    let git_dir = project_root.join(".git");
    if !git_dir.is_dir() {
        return Ok(());
    }
    let exclude_path = git_dir.join("info").join("exclude");
    let entry = format!("{}/", rel_path.to_string_lossy());

    let existing = std::fs::read_to_string(&exclude_path).unwrap_or_default();
    if existing.lines().any(|l| l.trim() == entry.trim_end_matches('/')
        || l.trim() == entry)
    {
        return Ok(());
    }

    std::fs::create_dir_all(git_dir.join("info"))?;
    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&entry);
    updated.push('\n');
    std::fs::write(&exclude_path, updated)
        .with_context(|| format!("writing {}", exclude_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_entry_once() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(".git")).unwrap();
        ensure_excluded(tmp.path(), Path::new(".skillshare/skills")).unwrap();
        ensure_excluded(tmp.path(), Path::new(".skillshare/skills")).unwrap();
        let content = std::fs::read_to_string(tmp.path().join(".git/info/exclude")).unwrap();
        assert_eq!(content.matches(".skillshare/skills").count(), 1);
    }

    #[test]
    fn no_op_outside_git_repo() {
        let tmp = tempfile::tempdir().unwrap();
        ensure_excluded(tmp.path(), Path::new(".skillshare/skills")).unwrap();
        assert!(!tmp.path().join(".git").exists());
    }
}
