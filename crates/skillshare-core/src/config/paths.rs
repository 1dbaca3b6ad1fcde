//! XDG base directory resolution. `dirs::config_dir`/`cache_dir`/
//! `data_dir` already honor `XDG_CONFIG_HOME`/`XDG_CACHE_HOME`/
//! `XDG_DATA_HOME` on Linux, but we read the env vars directly first so
//! behavior is identical and testable across platforms.

use std::path::PathBuf;

fn xdg_or(env_var: &str, fallback: impl FnOnce() -> Option<PathBuf>) -> PathBuf {
    std::env::var_os(env_var)
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(fallback)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_dir() -> PathBuf {
    xdg_or("XDG_CONFIG_HOME", dirs::config_dir)
}

pub fn cache_dir() -> PathBuf {
    xdg_or("XDG_CACHE_HOME", dirs::cache_dir)
}

pub fn data_dir() -> PathBuf {
    xdg_or("XDG_DATA_HOME", dirs::data_dir)
}

pub fn global_config_path() -> PathBuf {
    config_dir().join("skillshare").join("config.yaml")
}

pub fn project_config_dir(project_root: &std::path::Path) -> PathBuf {
    project_root.join(".skillshare")
}

pub fn project_config_path(project_root: &std::path::Path) -> PathBuf {
    project_config_dir(project_root).join("config.yaml")
}

pub fn project_skills_dir(project_root: &std::path::Path) -> PathBuf {
    project_config_dir(project_root).join("skills")
}

pub fn discovery_cache_dir() -> PathBuf {
    cache_dir().join("skillshare")
}

pub fn trash_dir() -> PathBuf {
    data_dir().join("skillshare").join("trash")
}

pub fn backups_dir() -> PathBuf {
    data_dir().join("skillshare").join("backups")
}

pub fn logs_dir() -> PathBuf {
    data_dir().join("skillshare").join("logs")
}

/// Search upward from `start` for a `.skillshare/config.yaml`, returning
/// the project root directory if found.
pub fn find_project_root(start: &std::path::Path) -> Option<PathBuf> {
    let mut dir = Some(start.to_path_buf());
    while let Some(d) = dir {
        if project_config_path(&d).is_file() {
            return Some(d);
        }
        dir = d.parent().map(|p| p.to_path_buf());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_env_override_takes_precedence() {
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/tmp/skillshare-test-config");
        }
        assert_eq!(config_dir(), PathBuf::from("/tmp/skillshare-test-config"));
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
        }
    }

    #[test]
    fn find_project_root_walks_upward() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(tmp.path().join(".skillshare")).unwrap();
        std::fs::write(tmp.path().join(".skillshare/config.yaml"), "source: .\ntargets: {}\n").unwrap();
        let found = find_project_root(&nested).unwrap();
        assert_eq!(found, tmp.path());
    }
}
