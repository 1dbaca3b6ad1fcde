//! Flat-name computation: a skill's relative path with separators
//! replaced by `__`, used as its filename inside a merge/copy target.

use std::path::Path;

pub fn flat_name(rel_path: &Path) -> String {
    rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn flattens_nested_path() {
        assert_eq!(flat_name(&PathBuf::from("_repo/skills/alpha")), "_repo__skills__alpha");
    }

    #[test]
    fn single_segment_unchanged() {
        assert_eq!(flat_name(&PathBuf::from("alpha")), "alpha");
    }
}
