use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Device {
    pub(crate) serial: String,
    pub(crate) state: String,
    pub(crate) attributes: HashMap<String, String>,
}

impl Device {
    pub(crate) fn display_name(&self) -> String {
        let label = ["model", "product"].iter().find_map(|key| {
            self.attributes
                .get(*key)
                .map(|value| value.replace('_', " "))
                .filter(|value| !value.is_empty())
        });

        match label {
            Some(label) => format!("{label} ({})", self.serial),
            None => self.serial.clone(),
        }
    }

    pub(crate) fn subtitle(&self) -> String {
        match self.attributes.get("transport_id") {
            Some(transport) => format!("{} · transport:{transport}", self.state),
            None => self.state.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RemotePathEntry {
    pub(crate) name: String,
    pub(crate) full_path: String,
    pub(crate) is_directory: bool,
}

impl RemotePathEntry {
    pub(crate) fn display_name(&self) -> String {
        if self.is_directory {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LocalPathEntry {
    pub(crate) name: String,
    pub(crate) full_path: String,
    pub(crate) is_directory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InputMethodEntry {
    pub(crate) id: String,
    pub(crate) is_enabled: bool,
    pub(crate) is_current: bool,
}

impl InputMethodEntry {
    pub(crate) fn state_label(&self) -> &'static str {
        if self.is_current {
            "current"
        } else if self.is_enabled {
            "enabled"
        } else {
            "disabled"
        }
    }
}

/// One finished invocation of the wrapped tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommandResult {
    pub(crate) command: String,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) status: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum RebootMode {
    #[default]
    System,
    Recovery,
    Bootloader,
    Sideload,
}

impl RebootMode {
    pub(crate) fn adb_args(self) -> Vec<String> {
        let mut args = vec!["reboot".to_string()];
        match self {
            RebootMode::System => {}
            RebootMode::Recovery => args.push("recovery".to_string()),
            RebootMode::Bootloader => args.push("bootloader".to_string()),
            RebootMode::Sideload => args.push("sideload".to_string()),
        }
        args
    }
}

impl FromStr for RebootMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "system" => Ok(RebootMode::System),
            "recovery" => Ok(RebootMode::Recovery),
            "bootloader" => Ok(RebootMode::Bootloader),
            "sideload" => Ok(RebootMode::Sideload),
            _ => Err(
                "reboot mode must be one of: system, recovery, bootloader, sideload.".to_string(),
            ),
        }
    }
}
