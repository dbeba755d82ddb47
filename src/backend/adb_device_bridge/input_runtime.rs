use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{AdbService, AdbTarget};
use crate::adb_output::{
    input_method_query_candidates, merge_input_method_entries, parse_current_input_method,
    parse_input_method_ids,
};
use crate::backend::common::constants::SYSTEM_KEY_CODES;
use crate::backend::common::dtos::InputMethodEntry;
use crate::backend::common::errors::AdbError;
use crate::shell_command::{quote_remote_argument, shell_quote};

pub(crate) fn is_system_key_code(code: u32) -> bool {
    SYSTEM_KEY_CODES.contains(&code)
}

impl AdbService {
    /// Tries each query form in order. Only the first attempt's failure is
    /// reported; later forms are best-effort.
    pub(crate) async fn list_input_method_ids(
        &self,
        target: &AdbTarget,
        all: bool,
    ) -> Result<Vec<String>, AdbError> {
        let candidates = input_method_query_candidates(all);
        let Some((first, rest)) = candidates.split_first() else {
            return Ok(Vec::new());
        };

        let first_ids = parse_input_method_ids(&self.execute(target, first).await?.stdout);
        if !first_ids.is_empty() {
            return Ok(first_ids);
        }

        for args in rest {
            let output = match self.execute(target, args).await {
                Ok(result) => result.stdout,
                Err(error) => {
                    tracing::debug!(%error, query = %args.join(" "), "input method query form failed");
                    continue;
                }
            };
            let ids = parse_input_method_ids(&output);
            if !ids.is_empty() {
                return Ok(ids);
            }
        }

        Ok(first_ids)
    }

    pub(crate) async fn current_input_method(&self, target: &AdbTarget) -> Result<String, AdbError> {
        if let Ok(output) = self
            .stdout(
                target,
                &["shell", "settings", "get", "secure", "default_input_method"],
            )
            .await
        {
            let value = output.trim();
            if !value.is_empty() && value != "null" {
                return Ok(value.to_string());
            }
        }

        let dumpsys = self
            .stdout(target, &["shell", "dumpsys", "input_method"])
            .await?;
        Ok(parse_current_input_method(&dumpsys))
    }

    /// All ids, enabled ids and the current id merged into one view. Returns
    /// the current id alongside.
    pub(crate) async fn fetch_input_method_entries(
        &self,
        target: &AdbTarget,
    ) -> Result<(Vec<InputMethodEntry>, String), AdbError> {
        let all_ids = self.list_input_method_ids(target, true).await?;
        let enabled_ids = self.list_input_method_ids(target, false).await?;
        let current = self.current_input_method(target).await?;
        let entries = merge_input_method_entries(&all_ids, &enabled_ids, &current);
        Ok((entries, current))
    }

    pub(crate) async fn enable_input_method(&self, target: &AdbTarget, id: &str) -> Result<String, AdbError> {
        let id = quote_remote_argument(id);
        self.stdout(target, &["shell", "ime", "enable", &id]).await
    }

    pub(crate) async fn set_input_method(&self, target: &AdbTarget, id: &str) -> Result<String, AdbError> {
        let id = quote_remote_argument(id);
        self.stdout(target, &["shell", "ime", "set", &id]).await
    }

    pub(crate) async fn reset_input_method(&self, target: &AdbTarget) -> Result<String, AdbError> {
        self.stdout(target, &["shell", "ime", "reset"]).await
    }

    async fn adb_keyboard_broadcast(
        &self,
        target: &AdbTarget,
        action: &str,
        extras: &[&str],
    ) -> Result<String, AdbError> {
        let mut args = vec!["shell", "am", "broadcast", "-a", action];
        args.extend_from_slice(extras);
        self.stdout(target, &args).await
    }

    pub(crate) async fn send_adb_keyboard_text(&self, target: &AdbTarget, text: &str) -> Result<String, AdbError> {
        let message = shell_quote(text);
        self.adb_keyboard_broadcast(target, "ADB_INPUT_TEXT", &["--es", "msg", &message])
            .await
    }

    pub(crate) async fn send_adb_keyboard_text_base64(
        &self,
        target: &AdbTarget,
        text: &str,
    ) -> Result<String, AdbError> {
        let encoded = STANDARD.encode(text.as_bytes());
        self.adb_keyboard_broadcast(target, "ADB_INPUT_B64", &["--es", "msg", &encoded])
            .await
    }

    pub(crate) async fn send_adb_keyboard_key_event(
        &self,
        target: &AdbTarget,
        code: u32,
    ) -> Result<String, AdbError> {
        let code = code.to_string();
        self.adb_keyboard_broadcast(target, "ADB_INPUT_CODE", &["--ei", "code", &code])
            .await
    }

    pub(crate) async fn send_adb_keyboard_editor_action(
        &self,
        target: &AdbTarget,
        code: u32,
    ) -> Result<String, AdbError> {
        let code = code.to_string();
        self.adb_keyboard_broadcast(target, "ADB_EDITOR_CODE", &["--ei", "code", &code])
            .await
    }

    pub(crate) async fn send_adb_keyboard_unicode_codes(
        &self,
        target: &AdbTarget,
        codes_csv: &str,
    ) -> Result<String, AdbError> {
        let codes = quote_remote_argument(codes_csv);
        self.adb_keyboard_broadcast(target, "ADB_INPUT_CHARS", &["--eia", "chars", &codes])
            .await
    }

    pub(crate) async fn send_adb_keyboard_meta_code(
        &self,
        target: &AdbTarget,
        meta_code: &str,
    ) -> Result<String, AdbError> {
        let meta_code = quote_remote_argument(meta_code);
        self.adb_keyboard_broadcast(target, "ADB_INPUT_TEXT", &["--es", "mcode", &meta_code])
            .await
    }

    pub(crate) async fn clear_adb_keyboard_text(&self, target: &AdbTarget) -> Result<String, AdbError> {
        self.adb_keyboard_broadcast(target, "ADB_CLEAR_TEXT", &[]).await
    }

    pub(crate) async fn send_shell_key_event(&self, target: &AdbTarget, code: u32) -> Result<String, AdbError> {
        let code = code.to_string();
        match self.stdout(target, &["shell", "input", "keyevent", &code]).await {
            Ok(output) => Ok(output),
            Err(error) => {
                tracing::warn!(%error, "input keyevent failed; retrying through cmd input");
                self.stdout(target, &["shell", "cmd", "input", "keyevent", &code])
                    .await
            }
        }
    }

    /// Navigation keys go through the system input service; everything else
    /// goes to the ADB keyboard.
    pub(crate) async fn send_key_event(&self, target: &AdbTarget, code: u32) -> Result<String, AdbError> {
        if is_system_key_code(code) {
            self.send_shell_key_event(target, code).await
        } else {
            self.send_adb_keyboard_key_event(target, code).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::common::process_command::test_support::{args, ScriptedRunner};
    use std::sync::Arc;

    fn target() -> AdbTarget {
        AdbTarget::device("adb", "X")
    }

    #[tokio::test]
    async fn falls_through_query_forms_until_ids_appear() {
        let runner = ScriptedRunner::new(|argv| {
            if argv.iter().any(|arg| arg == "cmd") {
                Ok("mId=com.a/.A\n".to_string())
            } else if argv.len() == 4 {
                Ok("nothing useful\n".to_string())
            } else {
                Err("unknown option".to_string())
            }
        });
        let calls = runner.call_log();
        let service = AdbService::new(Arc::new(runner));

        let ids = service.list_input_method_ids(&target(), false).await.expect("ids");
        assert_eq!(ids, vec!["com.a/.A"]);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn first_query_failure_propagates() {
        let service = AdbService::new(Arc::new(ScriptedRunner::new(|_| Err("closed".to_string()))));
        assert!(service.list_input_method_ids(&target(), true).await.is_err());
    }

    #[tokio::test]
    async fn later_failures_fall_back_to_first_empty_result() {
        let runner = ScriptedRunner::new(|argv| {
            if argv == args(&["shell", "ime", "list", "-a", "-s"]).as_slice() {
                Ok(String::new())
            } else {
                Err("boom".to_string())
            }
        });
        let calls = runner.call_log();
        let service = AdbService::new(Arc::new(runner));

        let ids = service.list_input_method_ids(&target(), true).await.expect("ids");
        assert!(ids.is_empty());
        assert_eq!(calls.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn current_input_method_falls_back_to_dumpsys() {
        let service = AdbService::new(Arc::new(ScriptedRunner::new(|argv| {
            if argv.iter().any(|arg| arg == "settings") {
                Ok("null\n".to_string())
            } else {
                Ok("  mCurMethodId=com.b/.B\n".to_string())
            }
        })));

        assert_eq!(
            service.current_input_method(&target()).await.expect("current"),
            "com.b/.B"
        );
    }

    #[tokio::test]
    async fn current_input_method_prefers_settings_value() {
        let runner = ScriptedRunner::new(|_| Ok("com.c/.C\n".to_string()));
        let calls = runner.call_log();
        let service = AdbService::new(Arc::new(runner));

        assert_eq!(
            service.current_input_method(&target()).await.expect("current"),
            "com.c/.C"
        );
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn merges_entries_from_three_queries() {
        let service = AdbService::new(Arc::new(ScriptedRunner::new(|argv| {
            let joined = argv.join(" ");
            if joined.contains("settings") {
                Ok("com.z/.Z".to_string())
            } else if joined.contains("-a") {
                Ok("mId=com.a/.A\nmId=com.b/.B\n".to_string())
            } else {
                Ok("com.b/.B\n".to_string())
            }
        })));

        let (entries, current) = service
            .fetch_input_method_entries(&target())
            .await
            .expect("entries");
        assert_eq!(current, "com.z/.Z");
        let labels = entries
            .iter()
            .map(|entry| format!("{} {}", entry.id, entry.state_label()))
            .collect::<Vec<_>>();
        assert_eq!(
            labels,
            vec!["com.a/.A disabled", "com.b/.B enabled", "com.z/.Z current"]
        );
    }

    #[tokio::test]
    async fn keyboard_text_is_quoted_and_base64_is_standard() {
        let runner = ScriptedRunner::new(|_| Ok("Broadcast completed".to_string()));
        let calls = runner.call_log();
        let service = AdbService::new(Arc::new(runner));

        service
            .send_adb_keyboard_text(&target(), "hi there")
            .await
            .expect("text");
        service
            .send_adb_keyboard_text_base64(&target(), "你好")
            .await
            .expect("b64");

        let calls = calls.lock().unwrap().clone();
        assert_eq!(
            calls[0],
            args(&["shell", "am", "broadcast", "-a", "ADB_INPUT_TEXT", "--es", "msg", "'hi there'"])
        );
        assert_eq!(
            calls[1],
            args(&["shell", "am", "broadcast", "-a", "ADB_INPUT_B64", "--es", "msg", "5L2g5aW9"])
        );
    }

    #[tokio::test]
    async fn key_events_route_by_code() {
        let runner = ScriptedRunner::new(|_| Ok(String::new()));
        let calls = runner.call_log();
        let service = AdbService::new(Arc::new(runner));

        service.send_key_event(&target(), 4).await.expect("back");
        service.send_key_event(&target(), 67).await.expect("del");

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls[0], args(&["shell", "input", "keyevent", "4"]));
        assert_eq!(
            calls[1],
            args(&["shell", "am", "broadcast", "-a", "ADB_INPUT_CODE", "--ei", "code", "67"])
        );
    }

    #[tokio::test]
    async fn shell_key_event_retries_through_cmd_input() {
        let runner = ScriptedRunner::new(|argv| {
            if argv[1] == "input" {
                Err("input: not found".to_string())
            } else {
                Ok(String::new())
            }
        });
        let calls = runner.call_log();
        let service = AdbService::new(Arc::new(runner));

        service.send_shell_key_event(&target(), 3).await.expect("home");
        assert_eq!(
            calls.lock().unwrap()[1],
            args(&["shell", "cmd", "input", "keyevent", "3"])
        );
    }
}
