//! Per-skill content checksum for the copy-mode manifest: sha256 over
//! the sorted sequence of (relative path, content bytes) pairs.

use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

pub fn checksum_tree(root: &Path) -> Result<String> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .into_owned();
            files.push((rel, entry.path().to_path_buf()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (rel, path) in files {
        hasher.update(rel.as_bytes());
        hasher.update([0u8]);
        let content = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        hasher.update(&content);
        hasher.update([0u8]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("SKILL.md"), "# a").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/b.txt"), "b").unwrap();

        let a = checksum_tree(tmp.path()).unwrap();
        let b = checksum_tree(tmp.path()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn checksum_changes_with_content() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("SKILL.md"), "# a").unwrap();
        let before = checksum_tree(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("SKILL.md"), "# b").unwrap();
        let after = checksum_tree(tmp.path()).unwrap();
        assert_ne!(before, after);
    }
}
