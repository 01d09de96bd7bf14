use crate::error::Result;
use std::path::{Component, Path, PathBuf};

/// Make `input` absolute and lexically clean relative to the current
/// directory. Symlinks are not resolved.
pub fn normalize(input: &str) -> Result<String> {
    let cwd = std::env::current_dir()?;
    Ok(normalize_with(input, &cwd))
}

/// Like [`normalize`] with an explicit base directory.
///
/// `~` expands to the home directory, `.` segments vanish, `..` pops one
/// segment (never above the root) and trailing separators are dropped.
pub fn normalize_with(input: &str, cwd: &Path) -> String {
    let expanded = expand_home(input);
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if out.parent().is_some() {
                    out.pop();
                }
            }
            Component::Normal(segment) => out.push(segment),
        }
    }

    out.to_string_lossy().into_owned()
}

fn expand_home(input: &str) -> PathBuf {
    let rest = if input == "~" {
        Some("")
    } else {
        input.strip_prefix("~/")
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(input),
    }
}

/// Drop the last segment of a normalized path: `/a/b` to `/a`, `/a` to `/`.
/// Returns `None` for the filesystem root or a path without separators.
pub fn strip_last_segment(path: &str) -> Option<&str> {
    let sep = std::path::MAIN_SEPARATOR;
    let idx = path.rfind(sep)?;
    if idx == 0 {
        return (path.len() > 1).then(|| &path[..1]);
    }
    Some(&path[..idx])
}

/// Number of separators in a path, the upper bound on backoff steps
pub fn separator_count(path: &str) -> usize {
    path.matches(std::path::MAIN_SEPARATOR).count()
}
