use std::sync::Arc;
use tokio::task::JoinHandle;

use super::session_runtime::{
    lock_state, output_or, required, required_existing_file, update_state, AppSession,
    SessionState, SharedState,
};
use crate::backend::adb_device_bridge::{AdbService, AdbTarget};
use crate::backend::common::constants::{
    ADB_KEYBOARD_IME_ID, ADB_KEYBOARD_SWITCH_SETTLE_DELAY, IME_SWITCH_SETTLE_DELAY,
};
use crate::backend::common::dtos::InputMethodEntry;
use crate::backend::common::errors::AdbError;

/// Keeps the selection when it is still listed, else prefers the current id.
fn apply_input_method_entries(state: &mut SessionState, entries: Vec<InputMethodEntry>, current: String) {
    let selected = state.selected_input_method.trim().to_string();
    let still_listed = entries.iter().any(|entry| entry.id == selected);
    if selected.is_empty() || !still_listed {
        state.selected_input_method = if current.is_empty() {
            entries.first().map(|entry| entry.id.clone()).unwrap_or_default()
        } else {
            current.clone()
        };
    }
    state.input_method_entries = entries;
    state.current_input_method = current;
}

async fn refresh_input_methods(
    service: &AdbService,
    target: &AdbTarget,
    state: &SharedState,
) -> Result<(usize, String), AdbError> {
    let (entries, current) = service.fetch_input_method_entries(target).await?;
    let count = entries.len();
    update_state(state, |state| {
        apply_input_method_entries(state, entries, current.clone())
    });
    Ok((count, current))
}

fn parse_code(value: &str, message: &str) -> Result<u32, AdbError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| AdbError::EmptySelection(message.to_string()))
}

impl AppSession {
    pub(crate) fn load_input_methods(&self) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("load input methods", async move {
            let (count, _) = refresh_input_methods(&service, &target, &state).await?;
            if count == 0 {
                Ok("no input methods found".to_string())
            } else {
                Ok(format!("loaded {count} input methods"))
            }
        })
    }

    pub(crate) fn select_input_method(&self, id: &str) {
        update_state(&self.state, |state| {
            state.selected_input_method = id.trim().to_string();
        });
    }

    /// Enables (best-effort) and sets the selected input method, then polls
    /// the device for the resulting current id.
    pub(crate) fn switch_input_method(&self, title: &str) -> Option<JoinHandle<()>> {
        let selected = lock_state(&self.state).selected_input_method.clone();
        self.switch_input_method_to(&selected, title)
    }

    /// Like `switch_input_method`, for an explicit id. The selection moves to
    /// `id` only once the operation is accepted.
    pub(crate) fn switch_input_method_to(&self, id: &str, title: &str) -> Option<JoinHandle<()>> {
        let (target, id) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(id, "switch failed: select an input method first")?))
        }))?;
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run(title, async move {
            update_state(&state, |state| state.selected_input_method = id.clone());
            if let Err(error) = service.enable_input_method(&target, &id).await {
                tracing::debug!(%error, id = %id, "enable before switch failed");
            }
            let output = service.set_input_method(&target, &id).await?;
            tokio::time::sleep(IME_SWITCH_SETTLE_DELAY).await;
            let (_, current) = refresh_input_methods(&service, &target, &state).await?;

            let fallback = if current == id {
                format!("switched input method: {id}")
            } else {
                format!("switch sent: {id} (current: {current})")
            };
            Ok(output_or(&output, fallback))
        })
    }

    pub(crate) fn switch_to_adb_keyboard(&self) -> Option<JoinHandle<()>> {
        self.switch_input_method_to(ADB_KEYBOARD_IME_ID, "switch input method to ADB keyboard")
    }

    pub(crate) fn enable_adb_keyboard(&self) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("enable ADB keyboard", async move {
            let output = service.enable_input_method(&target, ADB_KEYBOARD_IME_ID).await?;
            refresh_input_methods(&service, &target, &state).await?;
            Ok(output_or(&output, format!("enabled input method: {ADB_KEYBOARD_IME_ID}")))
        })
    }

    pub(crate) fn reset_input_method(&self) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("reset input method", async move {
            let output = service.reset_input_method(&target).await?;
            tokio::time::sleep(IME_SWITCH_SETTLE_DELAY).await;
            refresh_input_methods(&service, &target, &state).await?;
            Ok(output_or(&output, "input method reset to default"))
        })
    }

    pub(crate) fn install_adb_keyboard(&self, apk_path: &str) -> Option<JoinHandle<()>> {
        let (target, apk_path) = self.validated(self.device_target().and_then(|target| {
            Ok((
                target,
                required_existing_file(apk_path, "install failed: choose the ADB keyboard apk first")?,
            ))
        }))?;
        let service = self.service.clone();

        self.run("install ADB keyboard", async move {
            let output = service.install(&target, &apk_path, true).await?;
            Ok(output_or(&output, "ADB keyboard install sent"))
        })
    }

    pub(crate) fn set_keyboard_text(&self, text: &str) {
        update_state(&self.state, |state| state.adb_keyboard_text = text.to_string());
    }

    pub(crate) fn fill_keyboard_text_from_clipboard(&self) {
        let text = self
            .clipboard
            .as_ref()
            .and_then(|clipboard| clipboard.read_text())
            .map(|content| content.trim_matches(['\n', '\r']).to_string())
            .filter(|text| !text.is_empty());

        match text {
            Some(text) => {
                let count = text.chars().count();
                self.set_keyboard_text(&text);
                self.scheduler
                    .note(&format!("filled text from clipboard ({count} characters)"));
            }
            None => self.scheduler.note("clipboard has no text"),
        }
    }

    /// Sends the staged keyboard text, switching to the ADB keyboard first
    /// when configured to.
    pub(crate) fn send_keyboard_text(&self) -> Option<JoinHandle<()>> {
        let text = lock_state(&self.state).adb_keyboard_text.clone();
        let target = self.validated(self.device_target().and_then(|target| {
            required(&text, "send failed: text is empty")?;
            Ok(target)
        }))?;
        let use_base64 = self.settings.adb_keyboard_use_base64;
        let auto_switch = self.settings.adb_keyboard_auto_switch;
        let service = self.service.clone();

        self.run("send ADB keyboard text", async move {
            if auto_switch {
                if let Err(error) = service.enable_input_method(&target, ADB_KEYBOARD_IME_ID).await {
                    tracing::debug!(%error, "enable ADB keyboard before send failed");
                }
                service.set_input_method(&target, ADB_KEYBOARD_IME_ID).await?;
                tokio::time::sleep(ADB_KEYBOARD_SWITCH_SETTLE_DELAY).await;
            }

            let output = if use_base64 {
                service.send_adb_keyboard_text_base64(&target, &text).await?
            } else {
                service.send_adb_keyboard_text(&target, &text).await?
            };

            let mode = if use_base64 { "base64" } else { "plain text" };
            let clean = output_or(&output, "");
            if clean.is_empty() {
                Ok(format!("sent text ({mode})"))
            } else {
                Ok(format!("sent text ({mode})\n{clean}"))
            }
        })
    }

    pub(crate) fn clear_keyboard_text(&self) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let service = self.service.clone();

        self.run("clear device text field", async move {
            let output = service.clear_adb_keyboard_text(&target).await?;
            Ok(output_or(&output, "clear text sent"))
        })
    }

    pub(crate) fn send_key_event(&self, code: &str) -> Option<JoinHandle<()>> {
        let (target, code) = self.validated(self.device_target().and_then(|target| {
            Ok((
                target,
                parse_code(code, "keyevent must be a non-negative integer")?,
            ))
        }))?;
        let service = self.service.clone();

        self.run("send key event", async move {
            let output = service.send_key_event(&target, code).await?;
            Ok(output_or(&output, format!("sent keyevent: {code}")))
        })
    }

    pub(crate) fn send_system_key(&self, code: u32, label: &str) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let label = label.to_string();
        let service = self.service.clone();

        self.run("send quick key", async move {
            let output = service.send_shell_key_event(&target, code).await?;
            Ok(output_or(&output, format!("sent quick key: {label} ({code})")))
        })
    }

    pub(crate) fn send_editor_action(&self, code: &str) -> Option<JoinHandle<()>> {
        let (target, code) = self.validated(self.device_target().and_then(|target| {
            Ok((
                target,
                parse_code(code, "editor action code must be a non-negative integer")?,
            ))
        }))?;
        let service = self.service.clone();

        self.run("send editor action", async move {
            let output = service.send_adb_keyboard_editor_action(&target, code).await?;
            Ok(output_or(&output, format!("sent editor action: {code}")))
        })
    }

    pub(crate) fn send_unicode_codes(&self, codes: &str) -> Option<JoinHandle<()>> {
        let (target, codes) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(codes, "send unicode failed: code list is empty")?))
        }))?;
        let service = self.service.clone();

        self.run("send unicode codes", async move {
            let output = service.send_adb_keyboard_unicode_codes(&target, &codes).await?;
            Ok(output_or(&output, "sent unicode code sequence"))
        })
    }

    pub(crate) fn send_meta_code(&self, meta_code: &str) -> Option<JoinHandle<()>> {
        let (target, meta_code) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(meta_code, "send meta code failed: mcode is empty")?))
        }))?;
        let service = self.service.clone();

        self.run("send meta code", async move {
            let output = service.send_adb_keyboard_meta_code(&target, &meta_code).await?;
            Ok(output_or(&output, format!("sent mcode: {meta_code}")))
        })
    }
}
