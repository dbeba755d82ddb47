use super::binary_runtime::AdbBinCheckStatus;
use crate::backend::common::constants::ADB_PATH_ENV;

pub(crate) fn invalid_bin_warning(status: &AdbBinCheckStatus) -> Option<String> {
    if !status.has_issue {
        return None;
    }

    Some(format!(
        "{ADB_PATH_ENV} is invalid and may break adb command execution: {}",
        status.configured_path.as_deref().unwrap_or("<unset>")
    ))
}
