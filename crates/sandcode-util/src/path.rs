//! Path utilities.
//!
//! Everything that turns a client- or model-supplied string into a filesystem
//! location goes through [`safe_join`] or [`validate_segment`].

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Get the sandcode configuration directory.
///
/// On Unix this prefers `~/.config/sandcode` when it exists, otherwise the
/// platform configuration directory.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if let Some(home) = dirs::home_dir() {
            let xdg_config = home.join(".config").join("sandcode");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }
    }

    dirs::config_dir().map(|p| p.join("sandcode"))
}

/// Get the sandcode data directory (`~/.local/share/sandcode` on Linux).
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("sandcode"))
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this doesn't require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => {
                result.push(component);
            }
        }
    }

    result
}

/// Join a relative path onto `base`, refusing anything that would leave it.
///
/// Leading slashes are ignored so `/src/App.tsx` and `src/App.tsx` resolve to
/// the same file. `..` is allowed as long as it never climbs above `base`.
pub fn safe_join(base: &Path, rel: &str) -> Result<PathBuf> {
    let trimmed = rel.trim().trim_start_matches(['/', '\\']);
    let mut out = base.to_path_buf();
    let mut depth = 0usize;

    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(Error::path_escape(rel));
                }
                out.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::path_escape(rel));
            }
        }
    }

    Ok(out)
}

/// Convert a path under `base` into a forward-slash relative string.
///
/// Returns `None` if the path is not within the base directory.
pub fn relative_key(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Validate a single path segment such as a project name.
pub fn validate_segment<'a>(what: &str, name: &'a str) -> Result<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_name(format!("{what} cannot be empty")));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(Error::invalid_name(format!("invalid {what}: {name}")));
    }
    Ok(name)
}

/// Reduce a name to ASCII alphanumerics, `-` and `_`, or `default` when
/// nothing survives.
pub fn sanitize_name(name: Option<&str>, default: &str) -> String {
    let safe: String = name
        .unwrap_or(default)
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if safe.is_empty() {
        default.to_string()
    } else {
        safe
    }
}
