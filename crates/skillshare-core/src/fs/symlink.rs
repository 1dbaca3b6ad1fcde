//! Thin symlink wrapper. Skills are synced on unix-like systems; this
//! crate does not attempt Windows junction emulation.

use std::path::Path;

use anyhow::{Context, Result};

pub fn create(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
            .with_context(|| format!("symlinking {} -> {}", link.display(), target.display()))
    }
    #[cfg(not(unix))]
    {
        let _ = (target, link);
        anyhow::bail!("symlink sync modes require a unix-like filesystem")
    }
}

pub fn read(link: &Path) -> Result<std::path::PathBuf> {
    std::fs::read_link(link).with_context(|| format!("reading symlink {}", link.display()))
}

pub fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// A symlink is "broken" if it cannot be resolved (its target does not
/// exist).
pub fn is_broken(link: &Path) -> bool {
    is_symlink(link) && std::fs::metadata(link).is_err()
}

/// True if `link` (a symlink) resolves to a path under `root`.
pub fn resolves_under(link: &Path, root: &Path) -> bool {
    let Ok(resolved) = std::fs::canonicalize(link) else {
        return false;
    };
    let Ok(root) = std::fs::canonicalize(root) else {
        return false;
    };
    resolved.starts_with(root)
}
