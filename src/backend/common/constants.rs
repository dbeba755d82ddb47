use std::time::Duration;

pub(crate) const ADB_PATH_ENV: &str = "ADB_PATH";
pub(crate) const DEFAULT_ADB_BINARY: &str = "adb";
pub(crate) const ADB_PATH_CANDIDATES: [&str; 3] =
    ["/opt/homebrew/bin/adb", "/usr/local/bin/adb", "/usr/bin/adb"];

pub(crate) const SETTINGS_PATH_ENV: &str = "ADB_DESK_SETTINGS";
pub(crate) const SETTINGS_DIRECTORY_NAME: &str = ".adb-desk";
pub(crate) const SETTINGS_FILE_NAME: &str = "settings.json";
pub(crate) const LOG_FILTER_ENV: &str = "ADB_DESK_LOG";

pub(crate) const DEFAULT_CONNECTION_HOST: &str = "127.0.0.1:5555";
pub(crate) const DEFAULT_TCPIP_PORT: &str = "5555";
pub(crate) const DEFAULT_REMOTE_START_DIRECTORY: &str = "/sdcard/";

pub(crate) const DEFAULT_SCREEN_RECORD_SECONDS: u32 = 15;
pub(crate) const MIN_SCREEN_RECORD_SECONDS: u32 = 1;
pub(crate) const MAX_SCREEN_RECORD_SECONDS: u32 = 180;
pub(crate) const SCREEN_RECORD_REMOTE_PATH: &str = "/sdcard/__adb_tools_record.mp4";

pub(crate) const ADB_KEYBOARD_IME_ID: &str = "com.android.adbkeyboard/.AdbIME";
/// Help text `ime` prints when it does not know the `list` form it was given.
pub(crate) const UNSUPPORTED_IME_LIST_BANNER: &str = "ime <command>:";
pub(crate) const SYSTEM_KEY_CODES: [u32; 5] = [3, 4, 82, 111, 187];

pub(crate) const IME_SWITCH_SETTLE_DELAY: Duration = Duration::from_millis(260);
pub(crate) const ADB_KEYBOARD_SWITCH_SETTLE_DELAY: Duration = Duration::from_millis(320);
