//! A configured sync destination and the filtering/affinity rules that
//! decide which skills reach it.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::error::SkillshareError;
use crate::types::LinkMode;

#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub path: PathBuf,
    pub mode: LinkMode,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Target {
    /// Validate this target's glob patterns eagerly, so an invalid
    /// pattern fails before any target is modified.
    pub fn validate_patterns(&self) -> Result<()> {
        for pattern in self.include.iter().chain(self.exclude.iter()) {
            glob::Pattern::new(pattern).map_err(|e| SkillshareError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Whether `skill_name` passes this target's include/exclude filter.
    /// Include is an allow-list (skill must match at least one pattern,
    /// when non-empty); exclude is a deny-list applied after include.
    pub fn filter_allows(&self, skill_name: &str) -> Result<bool> {
        if !self.include.is_empty() {
            let matches_include = self
                .include
                .iter()
                .map(|p| glob::Pattern::new(p))
                .collect::<Result<Vec<_>, _>>()
                .context("compiling include patterns")?
                .iter()
                .any(|p| p.matches(skill_name));
            if !matches_include {
                return Ok(false);
            }
        }
        for pattern in &self.exclude {
            let compiled = glob::Pattern::new(pattern).context("compiling exclude pattern")?;
            if compiled.matches(skill_name) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Canonicalize a target-affinity alias the way `SKILL.md`'s `targets:`
/// front matter declares it, so `claude` matches a configured target
/// named `claude-code`.
fn canonicalize_alias(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    let stripped: String = lower.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    match stripped.as_str() {
        "claude" | "claudecode" => "claudecode".to_string(),
        "gemini" | "geminicli" => "geminicli".to_string(),
        "vscode" | "code" => "vscode".to_string(),
        other => other.to_string(),
    }
}

/// True if a skill declaring `targets: [alias, ...]` should sync to
/// `configured_target_name`.
pub fn affinity_matches(declared: &str, configured_target_name: &str) -> bool {
    canonicalize_alias(declared) == canonicalize_alias(configured_target_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_alias_matches_claude_code_target() {
        assert!(affinity_matches("claude", "claude-code"));
    }

    #[test]
    fn unrelated_aliases_do_not_match() {
        assert!(!affinity_matches("codex", "claude-code"));
    }

    #[test]
    fn filter_allows_respects_include_then_exclude() {
        let t = Target {
            name: "t".to_string(),
            path: PathBuf::from("/tmp/t"),
            mode: LinkMode::Merge,
            include: vec!["alpha*".to_string()],
            exclude: vec!["alpha-secret".to_string()],
        };
        assert!(t.filter_allows("alpha-one").unwrap());
        assert!(!t.filter_allows("alpha-secret").unwrap());
        assert!(!t.filter_allows("beta").unwrap());
    }
}
