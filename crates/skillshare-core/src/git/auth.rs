//! Auth environment injection for outbound git operations. Tokens are
//! passed as process environment additions only; they are never written
//! to stdout/stderr or to any log entry, and a `file://` URL never
//! receives them regardless of what tokens are available.

use std::collections::HashMap;

const GENERIC_TOKEN_VAR: &str = "SKILLSHARE_GIT_TOKEN";

fn host_of(clone_url: &str) -> Option<&str> {
    let without_scheme = clone_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(clone_url);
    without_scheme.split(['/', ':']).next()
}

/// Build the environment additions `git` should run with for `clone_url`.
/// Returns an empty map for `file://` URLs and SSH remotes (which use
/// the user's own key material, not a token).
pub fn env_for(clone_url: &str) -> HashMap<String, String> {
    let mut env = HashMap::new();
    if clone_url.starts_with("file://") {
        return env;
    }
    if clone_url.starts_with("git@") || clone_url.contains("://git@") {
        return env;
    }

    let token_var = match host_of(clone_url) {
        Some(h) if h.ends_with("github.com") => "GITHUB_TOKEN",
        Some(h) if h.ends_with("gitlab.com") => "GITLAB_TOKEN",
        Some(h) if h.ends_with("bitbucket.org") => "BITBUCKET_TOKEN",
        _ => GENERIC_TOKEN_VAR,
    };

    let token = std::env::var(token_var)
        .ok()
        .or_else(|| std::env::var(GENERIC_TOKEN_VAR).ok());

    if let Some(token) = token {
        // Use an askpass script-free approach: rewrite via a one-shot
        // git credential helper env var pair, consumed by `GIT_ASKPASS`
        // pointing at a tiny helper that echoes the token. We keep the
        // token itself only in the environment, never on argv.
        env.insert("SKILLSHARE_ASKPASS_TOKEN".to_string(), token);
        env.insert(
            "GIT_ASKPASS".to_string(),
            askpass_helper_path().to_string_lossy().into_owned(),
        );
    }

    env
}

/// Path to the tiny askpass helper script, materialized once into the
/// cache directory. The script does nothing but print
/// `$SKILLSHARE_ASKPASS_TOKEN`; git invokes it instead of prompting.
fn askpass_helper_path() -> std::path::PathBuf {
    let dir = crate::config::paths::cache_dir().join("skillshare");
    let path = dir.join("askpass.sh");
    if !path.exists() {
        let _ = std::fs::create_dir_all(&dir);
        let _ = std::fs::write(&path, "#!/bin/sh\nprintf '%s' \"$SKILLSHARE_ASKPASS_TOKEN\"\n");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = std::fs::metadata(&path) {
                let mut perms = meta.permissions();
                perms.set_mode(0o700);
                let _ = std::fs::set_permissions(&path, perms);
            }
        }
    }
    path
}
