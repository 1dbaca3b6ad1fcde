//! `config.yaml` schema (§6). Global scope is a map of named targets;
//! project scope (`.skillshare/config.yaml`) additionally accepts a
//! shorthand list form for `targets` and implies `source` at
//! `.skillshare/skills/`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::LinkMode;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TargetConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<LinkMode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// A deprecated legacy skill entry, migrated to the registry on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacySkillEntry {
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: String,
    #[serde(default)]
    pub mode: Option<LinkMode>,
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<LegacySkillEntry>,
}

impl Config {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            mode: None,
            targets: BTreeMap::new(),
            skills: Vec::new(),
        }
    }

    pub fn default_mode(&self) -> LinkMode {
        self.mode.unwrap_or_default()
    }
}

/// Shorthand form accepted for a project-scope target list entry:
/// either a bare name (inheriting the default mode) or `{name, mode}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectTargetEntry {
    Name(String),
    NamedWithMode { name: String, mode: Option<LinkMode> },
}
