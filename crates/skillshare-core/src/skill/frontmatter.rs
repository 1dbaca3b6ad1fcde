//! `SKILL.md` optional YAML front matter. Recognized keys: `name`,
//! `targets`. Front matter is delimited by `---` lines at the top of the
//! file; its absence is permitted.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrontMatter {
    pub name: Option<String>,
    #[serde(default)]
    pub targets: Option<Vec<String>>,
}

pub fn parse(content: &str) -> Result<FrontMatter> {
    let trimmed = content.trim_start();
    if !trimmed.starts_with("---") {
        return Ok(FrontMatter::default());
    }
    let after_open = &trimmed[3..];
    let Some(close_idx) = after_open.find("\n---") else {
        return Ok(FrontMatter::default());
    };
    let yaml_block = &after_open[..close_idx];
    let fm: FrontMatter =
        serde_yaml::from_str(yaml_block).context("parsing SKILL.md front matter")?;
    Ok(fm)
}

pub fn parse_file(path: &Path) -> Result<FrontMatter> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_front_matter_is_permitted() {
        let fm = parse("# Just a heading\n").unwrap();
        assert!(fm.name.is_none());
        assert!(fm.targets.is_none());
    }

    #[test]
    fn parses_name_and_targets() {
        let fm = parse("---\nname: alpha\ntargets: [claude, codex]\n---\n# Alpha\n").unwrap();
        assert_eq!(fm.name.as_deref(), Some("alpha"));
        assert_eq!(fm.targets, Some(vec!["claude".to_string(), "codex".to_string()]));
    }
}
