//! Implements the recognized-input chain of §4.1: local path, `file://`,
//! SSH, HTTPS (incl. GitLab's `/-/tree/<branch>/`), then git shorthand.

use std::path::Path;

use super::Source;
use crate::types::SourceType;

#[derive(Debug, thiserror::Error)]
#[error("could not parse source {raw:?}: {reason}")]
pub struct SourceParseError {
    pub raw: String,
    pub reason: String,
}

fn err(raw: &str, reason: impl Into<String>) -> SourceParseError {
    SourceParseError {
        raw: raw.to_string(),
        reason: reason.into(),
    }
}

/// Split on the first literal `//` that is not part of a scheme's `://`.
/// Returns `(before, Some(after))` when present.
fn split_subdir_separator(s: &str) -> (&str, Option<&str>) {
    let scheme_end = s.find("://").map(|i| i + 3).unwrap_or(0);
    let rest = &s[scheme_end..];
    match rest.find("//") {
        Some(idx) => {
            let abs = scheme_end + idx;
            (&s[..abs], Some(&s[abs + 2..]))
        }
        None => (s, None),
    }
}

fn normalize_subdir(raw: &str, subdir: &str) -> Result<String, SourceParseError> {
    let trimmed = subdir.trim_matches('/');
    if trimmed.split('/').any(|seg| seg == "..") {
        return Err(err(raw, "subdir must not contain .. segments"));
    }
    Ok(trimmed.to_string())
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .find(|seg| !seg.is_empty())
        .unwrap_or(path)
}

fn strip_git_suffix(s: &str) -> &str {
    s.strip_suffix(".git").unwrap_or(s)
}

/// Parse a raw source string into a canonical [`Source`].
pub fn parse(raw: &str) -> Result<Source, SourceParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(err(raw, "empty source string"));
    }

    // 1. Local path.
    if Path::new(trimmed).is_dir() {
        let abs = std::fs::canonicalize(trimmed)
            .map_err(|e| err(raw, format!("could not resolve local path: {e}")))?;
        let name = abs
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| abs.to_string_lossy().into_owned());
        return Ok(Source {
            kind: SourceType::LocalPath,
            clone_url: abs.to_string_lossy().into_owned(),
            subdir: String::new(),
            name,
            raw: raw.to_string(),
        });
    }

    // 2. file:// URL.
    if let Some(rest) = trimmed.strip_prefix("file://") {
        let (path_part, subdir_part) = split_subdir_separator(rest);
        let subdir = normalize_subdir(raw, subdir_part.unwrap_or(""))?;
        let name = if subdir.is_empty() {
            last_segment(path_part).to_string()
        } else {
            last_segment(&subdir).to_string()
        };
        return Ok(Source {
            kind: SourceType::GitFile,
            clone_url: format!("file://{path_part}"),
            subdir,
            name,
            raw: raw.to_string(),
        });
    }

    // 3. SSH shorthand: git@host:owner/repo[.git][/subdir-after-//]
    if let Some(at_idx) = trimmed.find('@') {
        if let Some(colon_idx) = trimmed[at_idx..].find(':') {
            let colon_idx = at_idx + colon_idx;
            if !trimmed[..at_idx].contains('/') && !trimmed[..colon_idx].contains("://") {
                let (url_part, subdir_part) = split_subdir_separator(trimmed);
                let subdir = normalize_subdir(raw, subdir_part.unwrap_or(""))?;
                let repo_part = strip_git_suffix(&url_part[colon_idx + 1..]);
                let name = if subdir.is_empty() {
                    last_segment(repo_part).to_string()
                } else {
                    last_segment(&subdir).to_string()
                };
                let clone_url = format!("{}:{}.git", &url_part[..colon_idx], repo_part);
                return Ok(Source {
                    kind: SourceType::GitSsh,
                    clone_url,
                    subdir,
                    name,
                    raw: raw.to_string(),
                });
            }
        }
    }

    // 4. HTTPS URL.
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        let (url_part, explicit_subdir) = split_subdir_separator(trimmed);
        let scheme_end = url_part.find("://").unwrap() + 3;
        let after_scheme = &url_part[scheme_end..];
        let mut segs = after_scheme.splitn(2, '/');
        let host = segs.next().unwrap_or("");
        let path = segs.next().unwrap_or("");
        let path_segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if path_segs.len() < 2 {
            return Err(err(raw, "https URL must include owner/repo"));
        }
        let owner = path_segs[0];
        let repo_raw = strip_git_suffix(path_segs[1]);
        let mut subdir_segs: Vec<&str> = Vec::new();
        if path_segs.len() > 2 {
            // GitLab: owner/repo/-/tree/<branch>/rest...
            if path_segs[2] == "-" && path_segs.get(3) == Some(&"tree") {
                if let Some(rest) = path_segs.get(5..) {
                    subdir_segs.extend(rest);
                }
            } else {
                subdir_segs.extend(&path_segs[2..]);
            }
        }
        let mut subdir = subdir_segs.join("/");
        if let Some(explicit) = explicit_subdir {
            subdir = explicit.to_string();
        }
        let subdir = normalize_subdir(raw, &subdir)?;
        let clone_url = format!("https://{host}/{owner}/{repo_raw}.git");
        let name = if subdir.is_empty() {
            repo_raw.to_string()
        } else {
            last_segment(&subdir).to_string()
        };
        return Ok(Source {
            kind: SourceType::GitHttps,
            clone_url,
            subdir,
            name,
            raw: raw.to_string(),
        });
    }

    // 5. Git shorthand: owner/repo[/subdir].
    let (shorthand, explicit_subdir) = split_subdir_separator(trimmed);
    let segs: Vec<&str> = shorthand.split('/').filter(|s| !s.is_empty()).collect();
    if segs.len() >= 2 {
        let owner = segs[0];
        let repo = strip_git_suffix(segs[1]);
        let mut subdir = segs[2..].join("/");
        if let Some(explicit) = explicit_subdir {
            subdir = explicit.to_string();
        }
        let subdir = normalize_subdir(raw, &subdir)?;
        let name = if subdir.is_empty() {
            repo.to_string()
        } else {
            last_segment(&subdir).to_string()
        };
        return Ok(Source {
            kind: SourceType::GitShorthand,
            clone_url: format!("https://github.com/{owner}/{repo}.git"),
            subdir,
            name,
            raw: raw.to_string(),
        });
    }

    Err(err(raw, "did not match any recognized source form"))
}
