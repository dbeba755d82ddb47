use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::common::constants::{
    DEFAULT_CONNECTION_HOST, DEFAULT_REMOTE_START_DIRECTORY, DEFAULT_SCREEN_RECORD_SECONDS,
    DEFAULT_TCPIP_PORT, MAX_SCREEN_RECORD_SECONDS, MIN_SCREEN_RECORD_SECONDS,
    SETTINGS_DIRECTORY_NAME, SETTINGS_FILE_NAME, SETTINGS_PATH_ENV,
};
use crate::paths::{dirs_home, normalize_remote_directory_path};

fn default_connection_host() -> String {
    DEFAULT_CONNECTION_HOST.to_string()
}

fn default_tcpip_port() -> String {
    DEFAULT_TCPIP_PORT.to_string()
}

fn default_remote_start_directory() -> String {
    DEFAULT_REMOTE_START_DIRECTORY.to_string()
}

fn default_screen_record_seconds() -> u32 {
    DEFAULT_SCREEN_RECORD_SECONDS
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeskSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) adb_path: Option<String>,
    #[serde(default = "default_connection_host")]
    pub(crate) connection_host: String,
    #[serde(default = "default_tcpip_port")]
    pub(crate) tcpip_port: String,
    #[serde(default = "default_remote_start_directory")]
    pub(crate) remote_start_directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) local_start_directory: Option<String>,
    #[serde(default = "default_screen_record_seconds")]
    pub(crate) screen_record_seconds: u32,
    #[serde(default = "default_true")]
    pub(crate) install_replace: bool,
    #[serde(default = "default_true")]
    pub(crate) adb_keyboard_use_base64: bool,
    #[serde(default = "default_true")]
    pub(crate) adb_keyboard_auto_switch: bool,
}

impl Default for DeskSettings {
    fn default() -> Self {
        Self {
            adb_path: None,
            connection_host: default_connection_host(),
            tcpip_port: default_tcpip_port(),
            remote_start_directory: default_remote_start_directory(),
            local_start_directory: None,
            screen_record_seconds: default_screen_record_seconds(),
            install_replace: true,
            adb_keyboard_use_base64: true,
            adb_keyboard_auto_switch: true,
        }
    }
}

pub(crate) fn clamp_screen_record_seconds(value: u32) -> u32 {
    value.clamp(MIN_SCREEN_RECORD_SECONDS, MAX_SCREEN_RECORD_SECONDS)
}

fn normalize_settings(mut settings: DeskSettings) -> DeskSettings {
    settings.adb_path = settings
        .adb_path
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    settings.local_start_directory = settings
        .local_start_directory
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    if settings.connection_host.trim().is_empty() {
        settings.connection_host = default_connection_host();
    }
    if settings.tcpip_port.trim().is_empty() {
        settings.tcpip_port = default_tcpip_port();
    }
    settings.remote_start_directory = normalize_remote_directory_path(&settings.remote_start_directory);
    settings.screen_record_seconds = clamp_screen_record_seconds(settings.screen_record_seconds);
    settings
}

pub(crate) fn settings_file() -> Result<PathBuf, String> {
    if let Some(from_env) = std::env::var(SETTINGS_PATH_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        return Ok(PathBuf::from(from_env));
    }

    let home = dirs_home().ok_or_else(|| "Could not resolve the home directory.".to_string())?;
    Ok(home.join(SETTINGS_DIRECTORY_NAME).join(SETTINGS_FILE_NAME))
}

pub(crate) fn write_settings_file(path: &Path, settings: &DeskSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|error| format!("Failed to create {}: {error}", parent.display()))?;
    }

    let body = serde_json::to_string_pretty(settings)
        .map_err(|error| format!("Failed to serialize settings: {error}"))?;
    fs::write(path, format!("{body}\n"))
        .map_err(|error| format!("Failed to write {}: {error}", path.display()))
}

/// Loads the settings file, creating it with defaults when missing and
/// rewriting it with defaults when it cannot be parsed.
pub(crate) fn ensure_settings(path: &Path) -> Result<DeskSettings, String> {
    if !path.is_file() {
        let settings = DeskSettings::default();
        write_settings_file(path, &settings)?;
        return Ok(settings);
    }

    let raw = fs::read_to_string(path)
        .map_err(|error| format!("Failed to read {}: {error}", path.display()))?;

    match serde_json::from_str::<DeskSettings>(&raw) {
        Ok(settings) => Ok(normalize_settings(settings)),
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                %error,
                "settings file unreadable; recovered with defaults"
            );
            let settings = DeskSettings::default();
            let _ = write_settings_file(path, &settings);
            Ok(settings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_defaults_when_missing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("settings.json");

        let settings = ensure_settings(&path).expect("settings");
        assert_eq!(settings, DeskSettings::default());
        assert!(path.is_file());
    }

    #[test]
    fn fills_missing_keys_and_normalizes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("settings.json");
        fs::write(
            &path,
            r#"{"adbPath":"  ","remoteStartDirectory":"data/local/tmp","screenRecordSeconds":900}"#,
        )
        .expect("write");

        let settings = ensure_settings(&path).expect("settings");
        assert_eq!(settings.adb_path, None);
        assert_eq!(settings.remote_start_directory, "/data/local/tmp/");
        assert_eq!(settings.screen_record_seconds, 180);
        assert_eq!(settings.connection_host, "127.0.0.1:5555");
        assert!(settings.install_replace);
    }

    #[test]
    fn recovers_from_corrupt_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("settings.json");
        fs::write(&path, "{not json").expect("write");

        let settings = ensure_settings(&path).expect("settings");
        assert_eq!(settings, DeskSettings::default());
        let rewritten = fs::read_to_string(&path).expect("read back");
        assert!(rewritten.contains("connectionHost"));
    }

    #[test]
    fn clamps_record_duration() {
        assert_eq!(clamp_screen_record_seconds(0), 1);
        assert_eq!(clamp_screen_record_seconds(15), 15);
        assert_eq!(clamp_screen_record_seconds(181), 180);
    }
}
