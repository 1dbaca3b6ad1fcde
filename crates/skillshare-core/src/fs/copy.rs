//! Recursive tree copy used by the local-path install strategy and
//! copy-mode sync. File symlinks are preserved as symlinks-to-target;
//! a symlink that resolves to a directory is materialized as a real
//! directory at the destination (regression case: skills must not leak
//! symlink structure that points back outside the copied tree).

use std::path::Path;

use anyhow::{Context, Result};

pub fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;
    for entry in std::fs::read_dir(src).with_context(|| format!("reading {}", src.display()))? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if file_type.is_symlink() {
            let target_is_dir = std::fs::metadata(&src_path).map(|m| m.is_dir()).unwrap_or(false);
            if target_is_dir {
                copy_tree(&src_path, &dest_path)?;
            } else {
                let link_target = std::fs::read_link(&src_path)
                    .with_context(|| format!("reading symlink {}", src_path.display()))?;
                crate::fs::symlink::create(&link_target, &dest_path)
                    .with_context(|| format!("recreating symlink {}", dest_path.display()))?;
            }
        } else if file_type.is_dir() {
            copy_tree(&src_path, &dest_path)?;
        } else {
            std::fs::copy(&src_path, &dest_path)
                .with_context(|| format!("copying {} to {}", src_path.display(), dest_path.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_symlink_becomes_real_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let real_dir = tmp.path().join("real");
        std::fs::create_dir_all(&real_dir).unwrap();
        std::fs::write(real_dir.join("f.txt"), "content").unwrap();
        std::fs::create_dir_all(&src).unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(&real_dir, src.join("linked")).unwrap();

        let dest = tmp.path().join("dest");
        copy_tree(&src, &dest).unwrap();

        #[cfg(unix)]
        {
            let meta = std::fs::symlink_metadata(dest.join("linked")).unwrap();
            assert!(!meta.file_type().is_symlink());
            assert!(meta.is_dir());
            assert_eq!(
                std::fs::read_to_string(dest.join("linked/f.txt")).unwrap(),
                "content"
            );
        }
    }

    #[test]
    #[cfg(unix)]
    fn file_symlink_is_recreated_as_a_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("real.txt"), "content").unwrap();
        std::os::unix::fs::symlink(src.join("real.txt"), src.join("linked.txt")).unwrap();

        let dest = tmp.path().join("dest");
        copy_tree(&src, &dest).unwrap();

        let meta = std::fs::symlink_metadata(dest.join("linked.txt")).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(std::fs::read_link(dest.join("linked.txt")).unwrap(), src.join("real.txt"));
    }
}
