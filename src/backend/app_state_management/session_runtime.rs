use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::adb_output::{cleaned_output, filter_packages};
use crate::backend::adb_device_bridge::{AdbService, AdbTarget};
use crate::backend::common::dtos::{
    Device, InputMethodEntry, LocalPathEntry, RebootMode, RemotePathEntry,
};
use crate::backend::common::errors::AdbError;
use crate::backend::desk_settings::settings_runtime::DeskSettings;
use crate::backend::operation_scheduler::scheduler_runtime::{
    OperationScheduler, SchedulerSnapshot,
};
use crate::navigation::NavigationHistory;
use crate::paths::normalize_local_directory_path;

/// Host clipboard, supplied by whatever front end drives the session.
pub(crate) trait ClipboardReader: Send + Sync {
    fn read_text(&self) -> Option<String>;
}

/// Everything the presentation layer renders. Replaced wholesale per refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionState {
    pub(crate) adb_path: String,
    pub(crate) devices: Vec<Device>,
    pub(crate) selected_serial: String,
    pub(crate) packages: Vec<String>,
    pub(crate) remote_history: NavigationHistory,
    pub(crate) remote_entries: Vec<RemotePathEntry>,
    pub(crate) selected_remote_path: String,
    pub(crate) local_directory: String,
    pub(crate) local_entries: Vec<LocalPathEntry>,
    pub(crate) selected_local_path: String,
    pub(crate) input_method_entries: Vec<InputMethodEntry>,
    pub(crate) current_input_method: String,
    pub(crate) selected_input_method: String,
    pub(crate) adb_keyboard_text: String,
    pub(crate) forward_rules: Vec<String>,
    pub(crate) reverse_rules: Vec<String>,
    pub(crate) shell_output: String,
    pub(crate) logcat_output: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionSnapshot {
    #[serde(flatten)]
    pub(crate) state: SessionState,
    pub(crate) can_go_back: bool,
    pub(crate) can_go_forward: bool,
    pub(crate) operation: SchedulerSnapshot,
}

pub(crate) type SharedState = Arc<Mutex<SessionState>>;

pub(crate) fn lock_state(state: &SharedState) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn update_state(state: &SharedState, apply: impl FnOnce(&mut SessionState)) {
    apply(&mut lock_state(state));
}

/// Trimmed `value`, or `EmptySelection(message)` when blank.
pub(crate) fn required(value: &str, message: &str) -> Result<String, AdbError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AdbError::EmptySelection(message.to_string()));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn required_existing_file(value: &str, message: &str) -> Result<String, AdbError> {
    let path = required(value, message)?;
    if !Path::new(&path).exists() {
        return Err(AdbError::EmptySelection(format!("file does not exist: {path}")));
    }
    Ok(path)
}

/// Cleaned tool output, or `fallback` when the tool printed nothing.
pub(crate) fn output_or(output: &str, fallback: impl Into<String>) -> String {
    let clean = cleaned_output(output);
    if clean.is_empty() {
        fallback.into()
    } else {
        clean
    }
}

/// One user's view of the bridge: projected state plus the single-flight
/// scheduler every action goes through.
#[derive(Clone)]
pub(crate) struct AppSession {
    pub(crate) service: AdbService,
    pub(crate) scheduler: OperationScheduler,
    pub(crate) settings: DeskSettings,
    pub(crate) state: SharedState,
    pub(crate) clipboard: Option<Arc<dyn ClipboardReader>>,
}

impl AppSession {
    pub(crate) fn new(service: AdbService, settings: DeskSettings, adb_path: &str) -> Self {
        let local_directory = normalize_local_directory_path(
            settings.local_start_directory.as_deref().unwrap_or_default(),
        );
        let state = SessionState {
            adb_path: adb_path.to_string(),
            devices: Vec::new(),
            selected_serial: String::new(),
            packages: Vec::new(),
            remote_history: NavigationHistory::new(&settings.remote_start_directory),
            remote_entries: Vec::new(),
            selected_remote_path: String::new(),
            local_directory,
            local_entries: Vec::new(),
            selected_local_path: String::new(),
            input_method_entries: Vec::new(),
            current_input_method: String::new(),
            selected_input_method: String::new(),
            adb_keyboard_text: String::new(),
            forward_rules: Vec::new(),
            reverse_rules: Vec::new(),
            shell_output: String::new(),
            logcat_output: String::new(),
        };

        Self {
            service,
            scheduler: OperationScheduler::new(),
            settings,
            state: Arc::new(Mutex::new(state)),
            clipboard: None,
        }
    }

    pub(crate) fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardReader>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        let state = lock_state(&self.state).clone();
        SessionSnapshot {
            can_go_back: state.remote_history.can_go_back(),
            can_go_forward: state.remote_history.can_go_forward(),
            state,
            operation: self.scheduler.snapshot(),
        }
    }

    pub(crate) fn adb_path(&self) -> String {
        lock_state(&self.state).adb_path.clone()
    }

    pub(crate) fn host_target(&self) -> AdbTarget {
        AdbTarget::host(&self.adb_path())
    }

    /// The selected device, or `EmptySelection` when none is selected.
    pub(crate) fn device_target(&self) -> Result<AdbTarget, AdbError> {
        let state = lock_state(&self.state);
        let serial = required(&state.selected_serial, "no device selected")?;
        Ok(AdbTarget::device(&state.adb_path, &serial))
    }

    /// Unwraps a validation result, reporting the failure instead of
    /// dispatching.
    pub(crate) fn validated<T>(&self, prepared: Result<T, AdbError>) -> Option<T> {
        match prepared {
            Ok(value) => Some(value),
            Err(error) => {
                self.scheduler.reject(&error);
                None
            }
        }
    }

    pub(crate) fn run<F>(&self, title: &str, body: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = Result<String, AdbError>> + Send + 'static,
    {
        self.scheduler.dispatch(title, body)
    }

    pub(crate) fn select_device(&self, serial: &str) {
        update_state(&self.state, |state| {
            state.selected_serial = serial.trim().to_string();
        });
    }

    pub(crate) fn refresh_devices(&self) -> Option<JoinHandle<()>> {
        let target = self.host_target();
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("refresh devices", async move {
            let found = service.list_devices(&target.adb_path).await?;
            let count = found.len();
            update_state(&state, |state| {
                let keep = found
                    .iter()
                    .any(|device| device.serial == state.selected_serial);
                if !keep {
                    state.selected_serial = found
                        .first()
                        .map(|device| device.serial.clone())
                        .unwrap_or_default();
                }
                state.devices = found;
            });
            Ok(format!("found {count} device(s)"))
        })
    }

    pub(crate) fn connect(&self, host: &str) -> Option<JoinHandle<()>> {
        let host = self.validated(required(host, "connect failed: host is empty"))?;
        let target = self.host_target();
        let service = self.service.clone();

        self.run("connect device", async move {
            let output = service.connect(&target.adb_path, &host).await?;
            Ok(output_or(&output, format!("connect sent: {host}")))
        })
    }

    pub(crate) fn disconnect(&self, host: Option<&str>) -> Option<JoinHandle<()>> {
        let host = host.map(|value| value.trim().to_string());
        let target = self.host_target();
        let service = self.service.clone();

        self.run("disconnect", async move {
            let output = service.disconnect(&target.adb_path, host.as_deref()).await?;
            Ok(output_or(&output, "disconnect sent"))
        })
    }

    pub(crate) fn tcpip(&self, port: &str) -> Option<JoinHandle<()>> {
        let (target, port) = self.validated(
            self.device_target()
                .and_then(|target| Ok((target, required(port, "tcpip port is empty")?))),
        )?;
        let service = self.service.clone();

        self.run("switch to tcpip", async move {
            let output = service.tcpip(&target, &port).await?;
            Ok(output_or(&output, format!("restarting in tcpip mode on port {port}")))
        })
    }

    pub(crate) fn reboot(&self, mode: RebootMode) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let service = self.service.clone();

        self.run("reboot device", async move {
            let output = service.reboot(&target, mode).await?;
            Ok(output_or(&output, "reboot sent"))
        })
    }

    pub(crate) fn install_apk(&self, apk_path: &str, replace: bool) -> Option<JoinHandle<()>> {
        let (target, apk_path) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required_existing_file(apk_path, "install failed: apk path is empty")?))
        }))?;
        let service = self.service.clone();

        self.run("install apk", async move {
            let output = service.install(&target, &apk_path, replace).await?;
            Ok(output_or(&output, format!("installed {apk_path}")))
        })
    }

    pub(crate) fn uninstall(&self, package_name: &str, keep_data: bool) -> Option<JoinHandle<()>> {
        let (target, package_name) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(package_name, "uninstall failed: package name is empty")?))
        }))?;
        let service = self.service.clone();

        self.run("uninstall app", async move {
            let output = service.uninstall(&target, &package_name, keep_data).await?;
            Ok(output_or(&output, format!("uninstalled {package_name}")))
        })
    }

    pub(crate) fn load_packages(&self) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("load packages", async move {
            let packages = service.list_packages(&target).await?;
            let count = packages.len();
            update_state(&state, |state| state.packages = packages);
            Ok(format!("loaded {count} packages"))
        })
    }

    pub(crate) fn filtered_packages(&self, keyword: &str) -> Vec<String> {
        filter_packages(&lock_state(&self.state).packages, keyword)
    }

    pub(crate) fn launch_app(&self, package_name: &str, activity: Option<&str>) -> Option<JoinHandle<()>> {
        let (target, package_name) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(package_name, "launch failed: package name is empty")?))
        }))?;
        let activity = activity
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let service = self.service.clone();

        self.run("launch app", async move {
            let output = service
                .launch(&target, &package_name, activity.as_deref())
                .await?;
            Ok(output_or(&output, format!("launched {package_name}")))
        })
    }

    pub(crate) fn stop_app(&self, package_name: &str) -> Option<JoinHandle<()>> {
        let (target, package_name) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(package_name, "stop failed: package name is empty")?))
        }))?;
        let service = self.service.clone();

        self.run("stop app", async move {
            let output = service.stop(&target, &package_name).await?;
            Ok(output_or(&output, format!("stopped {package_name}")))
        })
    }

    pub(crate) fn push_file(&self, local_path: &str, remote_path: &str) -> Option<JoinHandle<()>> {
        let (target, local_path, remote_path) = self.validated(self.device_target().and_then(|target| {
            let message = "push failed: local or device path is empty";
            Ok((target, required(local_path, message)?, required(remote_path, message)?))
        }))?;
        let service = self.service.clone();

        self.run("push file", async move {
            let output = service.push(&target, &local_path, &remote_path).await?;
            Ok(output_or(&output, format!("pushed to {remote_path}")))
        })
    }

    pub(crate) fn pull_file(&self, remote_path: &str, local_path: &str) -> Option<JoinHandle<()>> {
        let (target, remote_path, local_path) = self.validated(self.device_target().and_then(|target| {
            let message = "pull failed: device or local path is empty";
            Ok((target, required(remote_path, message)?, required(local_path, message)?))
        }))?;
        let service = self.service.clone();

        self.run("pull file", async move {
            let output = service.pull(&target, &remote_path, &local_path).await?;
            Ok(output_or(&output, format!("pulled to {local_path}")))
        })
    }

    pub(crate) fn capture_screenshot(&self, save_path: &str) -> Option<JoinHandle<()>> {
        let (target, save_path) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(save_path, "screenshot failed: save path is empty")?))
        }))?;
        let service = self.service.clone();

        self.run("capture screenshot", async move {
            service.screenshot(&target, &PathBuf::from(&save_path)).await?;
            Ok(format!("screenshot saved to {save_path}"))
        })
    }

    pub(crate) fn record_screen(&self, save_path: &str, seconds: Option<u32>) -> Option<JoinHandle<()>> {
        let (target, save_path) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(save_path, "screen record failed: save path is empty")?))
        }))?;
        let seconds = seconds.unwrap_or(self.settings.screen_record_seconds);
        let service = self.service.clone();

        self.run("record screen", async move {
            let output = service
                .screen_record(&target, &PathBuf::from(&save_path), seconds)
                .await?;
            Ok(cleaned_output(&output))
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{session_with, settle};
    use super::*;
    use crate::backend::common::process_command::test_support::{args, ScriptedRunner};

    #[tokio::test]
    async fn refresh_keeps_selection_when_still_present() {
        let session = session_with(ScriptedRunner::new(|_| {
            Ok("List of devices attached\nA device\nB device\n".to_string())
        }));
        session.select_device("B");

        settle(session.refresh_devices()).await;
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state.selected_serial, "B");
        assert_eq!(snapshot.state.devices.len(), 2);
        assert_eq!(snapshot.operation.status, "found 2 device(s)");
    }

    #[tokio::test]
    async fn refresh_selects_first_when_selection_vanished() {
        let session = session_with(ScriptedRunner::new(|_| {
            Ok("List of devices attached\nZ device\nY device\n".to_string())
        }));
        session.select_device("gone");

        settle(session.refresh_devices()).await;
        assert_eq!(session.snapshot().state.selected_serial, "Y");
    }

    #[tokio::test]
    async fn missing_device_is_reported_without_dispatch() {
        let runner = ScriptedRunner::new(|_| Ok(String::new()));
        let calls = runner.call_log();
        let session = session_with(runner);

        assert!(session.load_packages().is_none());
        assert!(calls.lock().unwrap().is_empty());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.operation.status, "no device selected");
        assert!(!session.scheduler.is_busy());
    }

    #[tokio::test]
    async fn blank_package_name_is_rejected() {
        let session = session_with(ScriptedRunner::new(|_| Ok(String::new())));
        session.select_device("X");

        assert!(session.uninstall("  ", false).is_none());
        assert_eq!(
            session.snapshot().operation.status,
            "uninstall failed: package name is empty"
        );
    }

    #[tokio::test]
    async fn empty_output_falls_back_to_summary() {
        let runner = ScriptedRunner::new(|_| Ok("\n".to_string()));
        let calls = runner.call_log();
        let session = session_with(runner);
        session.select_device("X");

        settle(session.stop_app(" com.app ")).await;
        assert_eq!(session.snapshot().operation.status, "stopped com.app");
        assert_eq!(
            calls.lock().unwrap()[0],
            args(&["shell", "am", "force-stop", "com.app"])
        );
    }

    #[tokio::test]
    async fn failures_surface_as_error_status() {
        let session = session_with(ScriptedRunner::new(|_| Err("device offline".to_string())));
        session.select_device("X");

        settle(session.reboot(RebootMode::Recovery)).await;
        assert_eq!(
            session.snapshot().operation.status,
            "error: command failed (1): device offline"
        );
    }

    #[tokio::test]
    async fn package_filter_is_case_insensitive() {
        let session = session_with(ScriptedRunner::new(|_| {
            Ok("package:com.Example.app\npackage:org.other\n".to_string())
        }));
        session.select_device("X");

        settle(session.load_packages()).await;
        assert_eq!(session.filtered_packages("example"), vec!["com.Example.app"]);
        assert_eq!(session.filtered_packages(" ").len(), 2);
    }
}
