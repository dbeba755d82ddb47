use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::common::constants::{ADB_PATH_CANDIDATES, ADB_PATH_ENV, DEFAULT_ADB_BINARY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdbBinaryResolution {
    pub(crate) path: PathBuf,
    pub(crate) source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdbBinCheckStatus {
    pub(crate) configured_path: Option<String>,
    pub(crate) configured_path_valid: Option<bool>,
    pub(crate) has_issue: bool,
    pub(crate) issue: Option<String>,
    pub(crate) effective_binary_path: String,
    pub(crate) effective_binary_source: String,
}

pub(crate) fn configured_adb_path() -> Option<String> {
    std::env::var(ADB_PATH_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn is_executable_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::metadata(path)
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        let _ = fs::metadata(path);
        true
    }
}

/// Env override first, then the conventional install prefixes, then a bare
/// name for the search path.
pub(crate) fn resolve_adb_binary_from(
    configured: Option<String>,
    candidates: &[&str],
) -> AdbBinaryResolution {
    if let Some(from_env) = configured {
        return AdbBinaryResolution {
            path: PathBuf::from(from_env),
            source: "env".to_string(),
        };
    }

    for candidate in candidates {
        let candidate = Path::new(candidate);
        if is_executable_file(candidate) {
            return AdbBinaryResolution {
                path: candidate.to_path_buf(),
                source: "candidate".to_string(),
            };
        }
    }

    AdbBinaryResolution {
        path: PathBuf::from(DEFAULT_ADB_BINARY),
        source: "path".to_string(),
    }
}

pub(crate) fn resolve_adb_binary() -> AdbBinaryResolution {
    resolve_adb_binary_from(configured_adb_path(), &ADB_PATH_CANDIDATES)
}

pub(crate) fn evaluate_adb_bin_check_status() -> AdbBinCheckStatus {
    let configured_path = configured_adb_path();
    let configured_path_valid = configured_path
        .as_ref()
        .map(|path| is_executable_file(Path::new(path)));
    let has_issue = matches!(configured_path_valid, Some(false));

    let issue = if has_issue {
        Some(format!(
            "{ADB_PATH_ENV} is set but does not point to an executable file. Unset it to use install-prefix/PATH resolution."
        ))
    } else {
        None
    };

    let resolved = resolve_adb_binary_from(configured_path.clone(), &ADB_PATH_CANDIDATES);

    AdbBinCheckStatus {
        configured_path,
        configured_path_valid,
        has_issue,
        issue,
        effective_binary_path: resolved.path.display().to_string(),
        effective_binary_source: resolved.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins() {
        let resolved = resolve_adb_binary_from(Some("/custom/adb".to_string()), &["/usr/bin/env"]);
        assert_eq!(resolved.path, PathBuf::from("/custom/adb"));
        assert_eq!(resolved.source, "env");
    }

    #[cfg(unix)]
    #[test]
    fn first_executable_candidate_is_used() {
        let temp = tempfile::tempdir().expect("tempdir");
        let plain = temp.path().join("plain");
        fs::write(&plain, b"").expect("write plain");
        let executable = temp.path().join("adb");
        fs::write(&executable, b"#!/bin/sh\n").expect("write adb");
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&executable, fs::Permissions::from_mode(0o755))
                .expect("chmod");
        }

        let plain_str = plain.to_string_lossy().to_string();
        let executable_str = executable.to_string_lossy().to_string();
        let resolved = resolve_adb_binary_from(None, &[plain_str.as_str(), executable_str.as_str()]);
        assert_eq!(resolved.path, executable);
        assert_eq!(resolved.source, "candidate");
    }

    #[test]
    fn falls_back_to_bare_name() {
        let resolved = resolve_adb_binary_from(None, &["/nonexistent/adb-desk/adb"]);
        assert_eq!(resolved.path, PathBuf::from("adb"));
        assert_eq!(resolved.source, "path");
    }
}
