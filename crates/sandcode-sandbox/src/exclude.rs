//! Paths never cached or written through the sandbox.

use std::path::{Component, Path};

/// Directory names whose contents are excluded (`node_modules/**`, ...).
pub const EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", "__pycache__"];

/// Whether a workspace-relative path lies under an excluded directory.
///
/// Only leading components count: a file that happens to be named `build`
/// is not excluded, anything inside a `build/` directory is.
pub fn is_excluded(rel: &str) -> bool {
    let parts: Vec<&str> = Path::new(rel.trim_start_matches(['/', '\\']))
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    parts
        .split_last()
        .is_some_and(|(_, leading)| leading.iter().any(|part| EXCLUDED_DIRS.contains(part)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_paths() {
        assert!(is_excluded("node_modules/react/index.js"));
        assert!(is_excluded("/.git/HEAD"));
        assert!(is_excluded("packages/app/dist/bundle.js"));
        assert!(is_excluded("src/__pycache__/mod.pyc"));
    }

    #[test]
    fn test_included_paths() {
        assert!(!is_excluded("src/App.jsx"));
        assert!(!is_excluded("distance.txt"));
        assert!(!is_excluded("builder/main.rs"));
        assert!(!is_excluded(""));
        assert!(!is_excluded("build"));
    }
}
