use super::{AdbService, AdbTarget};
use crate::adb_output::is_unsupported_ime_list_banner;
use crate::backend::common::errors::AdbError;
use crate::shell_command::{plan_shell_invocation, quote_remote_argument, ShellInvocation};

fn is_ime_list_request(tokens: &[String]) -> bool {
    tokens.len() >= 2 && tokens[0] == "ime" && tokens[1] == "list"
}

impl AdbService {
    /// Runs a free-form line on the device. A blank line is a no-op.
    pub(crate) async fn shell(&self, target: &AdbTarget, command: &str) -> Result<String, AdbError> {
        let Some(invocation) = plan_shell_invocation(command) else {
            return Ok(String::new());
        };

        let output = self.execute(target, &invocation.adb_args()).await?.stdout;

        if let ShellInvocation::Direct(tokens) = &invocation {
            if is_ime_list_request(tokens) && is_unsupported_ime_list_banner(&output) {
                if let Some(fallback) = self.ime_list_fallback(target, &tokens[2..]).await {
                    return Ok(fallback);
                }
            }
        }

        Ok(output)
    }

    async fn ime_list_fallback(&self, target: &AdbTarget, flags: &[String]) -> Option<String> {
        let args = ["shell", "cmd", "input_method", "list"]
            .iter()
            .map(|arg| arg.to_string())
            .chain(flags.iter().map(|flag| quote_remote_argument(flag)))
            .collect::<Vec<_>>();

        tracing::warn!("ime list answered with its usage banner; retrying through cmd input_method");
        match self.execute(target, &args).await {
            Ok(result) if !result.stdout.trim().is_empty() => Some(result.stdout),
            Ok(_) => None,
            Err(error) => {
                tracing::debug!(%error, "cmd input_method list failed");
                None
            }
        }
    }

    pub(crate) async fn fetch_logcat(&self, target: &AdbTarget) -> Result<String, AdbError> {
        self.stdout(target, &["logcat", "-d", "-v", "time"]).await
    }

    pub(crate) async fn clear_logcat(&self, target: &AdbTarget) -> Result<String, AdbError> {
        self.stdout(target, &["logcat", "-c"]).await
    }
}
