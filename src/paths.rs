use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

pub(crate) const REMOTE_ROOT: &str = "/";

fn absolute_remote(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{trimmed}"))
    }
}

/// Directory form of a device path: absolute, `/`-suffixed, root stays `/`.
pub(crate) fn normalize_remote_directory_path(path: &str) -> String {
    let Some(mut normalized) = absolute_remote(path) else {
        return REMOTE_ROOT.to_string();
    };

    if normalized != REMOTE_ROOT && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Item form of a device path: absolute, no trailing `/` except the root.
pub(crate) fn normalize_remote_item_path(path: &str) -> String {
    let Some(mut normalized) = absolute_remote(path) else {
        return REMOTE_ROOT.to_string();
    };

    if normalized != REMOTE_ROOT && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

pub(crate) fn join_remote_path(base_directory: &str, name: &str, is_directory: bool) -> String {
    let base = normalize_remote_directory_path(base_directory);
    let mut joined = format!("{base}{}", name.trim());

    if is_directory && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}

pub(crate) fn remote_parent_directory(path: &str) -> String {
    let current = normalize_remote_directory_path(path);
    if current == REMOTE_ROOT {
        return current;
    }

    let trimmed = current.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => REMOTE_ROOT.to_string(),
        Some(index) => format!("{}/", &trimmed[..index]),
    }
}

/// Destructive remote operations never target the filesystem root.
pub(crate) fn ensure_not_remote_root(path: &str, action: &str) -> Result<String, String> {
    let normalized = normalize_remote_item_path(path);
    if normalized == REMOTE_ROOT {
        return Err(format!("Refusing to {action} root directory"));
    }
    Ok(normalized)
}

pub(crate) fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(value) => out.push(value),
        }
    }
    out
}

fn is_filesystem_root(path: &Path) -> bool {
    path.parent().is_none()
}

/// Host directory form: absolute and separator-suffixed (except the root). An
/// existing non-directory collapses to its parent. Missing paths are kept as a
/// prospective directory.
pub(crate) fn normalize_local_directory_path(path: &str) -> String {
    let trimmed = path.trim();
    let raw = if trimmed.is_empty() {
        dirs_home().unwrap_or_else(|| PathBuf::from(MAIN_SEPARATOR.to_string()))
    } else {
        PathBuf::from(trimmed)
    };

    let absolute = if raw.is_absolute() {
        raw
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from(MAIN_SEPARATOR.to_string()))
            .join(raw)
    };

    let mut resolved = normalize_lexical(&absolute);
    if resolved.exists() && !resolved.is_dir() {
        if let Some(parent) = resolved.parent() {
            resolved = parent.to_path_buf();
        }
    }

    let mut rendered = resolved.to_string_lossy().to_string();
    if rendered.is_empty() {
        rendered.push(MAIN_SEPARATOR);
    }
    if !is_filesystem_root(&resolved) && !rendered.ends_with(MAIN_SEPARATOR) {
        rendered.push(MAIN_SEPARATOR);
    }
    rendered
}

pub(crate) fn local_parent_directory(path: &str) -> String {
    let current = normalize_local_directory_path(path);
    let current_path = PathBuf::from(&current);
    match current_path.parent() {
        Some(parent) => normalize_local_directory_path(&parent.to_string_lossy()),
        None => current,
    }
}
