//! A skill is a directory containing `SKILL.md`, identified by its path
//! relative to the source root.

pub mod frontmatter;
pub mod metadata;

pub use frontmatter::FrontMatter;
pub use metadata::SkillMetadata;

use std::path::{Path, PathBuf};

pub const SKILL_FILE: &str = "SKILL.md";
pub const META_FILE: &str = ".skillshare-meta.json";

/// A skill discovered beneath a source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
    /// Path relative to the source root, e.g. `_repo/skills/alpha`.
    pub rel_path: PathBuf,
    /// Absolute path to the skill directory.
    pub abs_path: PathBuf,
}

impl Skill {
    pub fn flat_name(&self) -> String {
        crate::fs::flat_name(&self.rel_path)
    }

    /// Bare display name: the last path segment.
    pub fn name(&self) -> String {
        self.rel_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.flat_name())
    }

    /// Group: the path prefix before the leaf name, empty at the root.
    pub fn group(&self) -> String {
        self.rel_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn skill_md_path(&self) -> PathBuf {
        self.abs_path.join(SKILL_FILE)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.abs_path.join(META_FILE)
    }

    pub fn is_tracked_repo_root(&self) -> bool {
        self.rel_path
            .components()
            .next()
            .map(|c| c.as_os_str().to_string_lossy().starts_with('_'))
            .unwrap_or(false)
    }

    pub fn front_matter(&self) -> anyhow::Result<FrontMatter> {
        frontmatter::parse_file(&self.skill_md_path())
    }

    pub fn metadata(&self) -> anyhow::Result<Option<SkillMetadata>> {
        metadata::read(&self.meta_path())
    }
}

/// Validate a skill or tracked-repo name per §3's invariant: lowercase
/// ASCII + digits + `-`/`_`, no `..` segments.
pub fn validate_name(name: &str) -> Result<(), crate::error::SkillshareError> {
    let bare = name.strip_prefix('_').unwrap_or(name);
    let valid = !bare.is_empty()
        && bare
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        && bare.chars().next().map(|c| c.is_ascii_lowercase() || c.is_ascii_digit()).unwrap_or(false);
    if !valid || name.contains('/') || name.contains("..") || Path::new(name).is_absolute() {
        return Err(crate::error::SkillshareError::InvalidName {
            name: name.to_string(),
            reason: "names must be lowercase ascii, digits, '-' or '_', no '/' or '..'".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dotdot_and_uppercase_and_absolute() {
        assert!(validate_name("../evil").is_err());
        assert!(validate_name("Evil").is_err());
        assert!(validate_name("/abs").is_err());
    }

    #[test]
    fn accepts_tracked_repo_prefix() {
        assert!(validate_name("_myrepo").is_ok());
    }

    #[test]
    fn flat_name_and_group() {
        let s = Skill {
            rel_path: PathBuf::from("_repo/skills/alpha"),
            abs_path: PathBuf::from("/src/_repo/skills/alpha"),
        };
        assert_eq!(s.flat_name(), "_repo__skills__alpha");
        assert_eq!(s.name(), "alpha");
        assert_eq!(s.group(), "_repo/skills");
    }
}
