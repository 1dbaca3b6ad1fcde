//! Atomic-write helpers: every mutable state file (config, registry,
//! manifest, cache) is written to a unique temp path beside its final
//! destination, then renamed into place, so a crash mid-write never
//! leaves a half-written file visible to a reader.

use std::path::Path;

use anyhow::{Context, Result};

pub fn write_atomic(dest: &Path, contents: &[u8]) -> Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| anyhow::anyhow!("destination {} has no parent", dest.display()))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("creating directory {}", parent.display()))?;

    let tmp_name = format!(
        ".{}.tmp-{}",
        dest.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        std::process::id()
    );
    let tmp_path = parent.join(tmp_name);
    std::fs::write(&tmp_path, contents)
        .with_context(|| format!("writing temp file {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, dest)
        .with_context(|| format!("renaming {} into {}", tmp_path.display(), dest.display()))?;
    Ok(())
}

/// Atomically replace a directory: materialize the new tree at a unique
/// temp path next to `dest`, then rename it over `dest`. On platforms
/// where directory rename is not atomic across an existing destination,
/// the old directory is removed first (a narrow non-atomic window, only
/// hit on cross-device destinations).
pub fn replace_dir_atomic(dest: &Path, build: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| anyhow::anyhow!("destination {} has no parent", dest.display()))?;
    std::fs::create_dir_all(parent)?;
    let tmp_path = parent.join(format!(
        ".{}.staging-{}",
        dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
        std::process::id()
    ));
    if tmp_path.exists() {
        std::fs::remove_dir_all(&tmp_path)?;
    }
    build(&tmp_path)?;

    if dest.exists() {
        match std::fs::rename(&tmp_path, dest) {
            Ok(()) => return Ok(()),
            Err(e) if is_exdev(&e) => {
                std::fs::remove_dir_all(dest)?;
                std::fs::rename(&tmp_path, dest)?;
                return Ok(());
            }
            Err(e) => return Err(e).context("renaming staged directory into place"),
        }
    }
    std::fs::rename(&tmp_path, dest).context("renaming staged directory into place")
}

/// True if an io error's underlying OS error is `EXDEV` (cross-device
/// link), which `rename` returns when source and destination are on
/// different filesystems/mounts.
pub fn is_exdev(err: &std::io::Error) -> bool {
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(libc_exdev())
    }
    #[cfg(not(unix))]
    {
        let _ = err;
        false
    }
}

#[cfg(unix)]
fn libc_exdev() -> i32 {
    18
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("a/b/file.txt");
        write_atomic(&dest, b"hello").unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "hello");
    }

    #[test]
    fn replace_dir_atomic_overwrites_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("target");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("old.txt"), "old").unwrap();

        replace_dir_atomic(&dest, |staging| {
            std::fs::create_dir_all(staging)?;
            std::fs::write(staging.join("new.txt"), "new")?;
            Ok(())
        })
        .unwrap();

        assert!(!dest.join("old.txt").exists());
        assert_eq!(std::fs::read_to_string(dest.join("new.txt")).unwrap(), "new");
    }
}
