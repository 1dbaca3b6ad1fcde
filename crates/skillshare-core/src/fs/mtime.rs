//! Fast change-detection helper for copy-mode sync: the max mtime of any
//! file in a subtree, compared against the manifest's recorded mtime
//! before paying for a full checksum.

use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};

pub fn newest_mtime(root: &Path) -> Result<SystemTime> {
    let mut newest = std::fs::metadata(root)
        .with_context(|| format!("stat {}", root.display()))?
        .modified()?;
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let modified = entry.metadata()?.modified()?;
        if modified > newest {
            newest = modified;
        }
    }
    Ok(newest)
}

pub fn unix_seconds(t: SystemTime) -> i64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_mtime_reflects_latest_write() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "a").unwrap();
        let t0 = newest_mtime(tmp.path()).unwrap();
        filetime::set_file_mtime(
            tmp.path().join("a.txt"),
            filetime::FileTime::from_unix_time(unix_seconds(t0) + 1000, 0),
        )
        .unwrap();
        let t1 = newest_mtime(tmp.path()).unwrap();
        assert!(t1 > t0);
    }
}
