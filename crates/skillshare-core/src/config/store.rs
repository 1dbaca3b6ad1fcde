//! Loads and saves `config.yaml` for a resolved scope.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::paths;
use super::schema::Config;
use crate::types::ConfigScope;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    scope: ConfigScope,
    config_path: PathBuf,
    /// Root the source is relative to — the global config dir for
    /// `Global`, the project root for `Project`.
    root: PathBuf,
}

impl ConfigStore {
    /// Resolve scope from an explicit `-p` project root, or by searching
    /// upward from the current directory for `.skillshare/config.yaml`;
    /// falls back to global scope when neither is found.
    pub fn resolve(project_root: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(root) = project_root {
            return Ok(Self::for_project(root.to_path_buf()));
        }
        let cwd = std::env::current_dir()?;
        if let Some(found) = paths::find_project_root(&cwd) {
            return Ok(Self::for_project(found));
        }
        Ok(Self::for_global())
    }

    pub fn for_global() -> Self {
        let config_path = paths::global_config_path();
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| paths::config_dir().join("skillshare"));
        Self {
            scope: ConfigScope::Global,
            config_path,
            root,
        }
    }

    pub fn for_project(project_root: PathBuf) -> Self {
        let config_path = paths::project_config_path(&project_root);
        Self {
            scope: ConfigScope::Project,
            config_path,
            root: project_root,
        }
    }

    pub fn scope(&self) -> ConfigScope {
        self.scope
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn project_root(&self) -> &Path {
        &self.root
    }

    pub fn load(&self) -> anyhow::Result<Config> {
        if !self.config_path.exists() {
            return match self.scope {
                ConfigScope::Project => Ok(Config::new(
                    paths::project_skills_dir(&self.root).to_string_lossy().into_owned(),
                )),
                ConfigScope::Global => Err(crate::error::SkillshareError::NoConfig.into()),
            };
        }
        let text = std::fs::read_to_string(&self.config_path)
            .with_context(|| format!("reading config at {}", self.config_path.display()))?;
        let config: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config at {}", self.config_path.display()))?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> anyhow::Result<()> {
        let body = serde_yaml::to_string(config).context("serializing config to YAML")?;
        crate::fs::atomic::write_atomic(&self.config_path, body.as_bytes())
    }

    pub fn source_dir(&self, config: &Config) -> PathBuf {
        let p = Path::new(&config.source);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_scope_defaults_to_dot_skillshare_skills() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ConfigStore::for_project(tmp.path().to_path_buf());
        let config = store.load().unwrap();
        assert!(config.source.ends_with(".skillshare/skills"));
    }

    #[test]
    fn round_trips_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ConfigStore::for_project(tmp.path().to_path_buf());
        let mut config = Config::new("skills");
        config.targets.insert(
            "claude-code".to_string(),
            super::super::schema::TargetConfig {
                path: "~/.claude/skills".to_string(),
                mode: None,
                include: vec![],
                exclude: vec![],
            },
        );
        store.save(&config).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.targets.len(), 1);
    }
}
