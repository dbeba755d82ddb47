use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::constants::DEFAULT_ADB_BINARY;
use super::dtos::CommandResult;
use super::errors::AdbError;

/// Runs the wrapped tool. Implementations must capture both streams fully and
/// report a non-zero exit as `AdbError::CommandFailed`.
#[async_trait]
pub(crate) trait AdbRunner: Send + Sync {
    async fn run(
        &self,
        adb_path: &str,
        serial: Option<&str>,
        args: &[String],
    ) -> Result<(CommandResult, Vec<u8>), AdbError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ProcessAdbRunner;

#[async_trait]
impl AdbRunner for ProcessAdbRunner {
    async fn run(
        &self,
        adb_path: &str,
        serial: Option<&str>,
        args: &[String],
    ) -> Result<(CommandResult, Vec<u8>), AdbError> {
        execute_raw(adb_path, serial, args).await
    }
}

pub(crate) fn normalize_adb_path(adb_path: &str) -> String {
    let trimmed = adb_path.trim();
    if trimmed.is_empty() {
        DEFAULT_ADB_BINARY.to_string()
    } else {
        trimmed.to_string()
    }
}

pub(crate) fn build_adb_argv(serial: Option<&str>, args: &[String]) -> Vec<String> {
    let mut argv = Vec::with_capacity(args.len() + 2);
    if let Some(serial) = serial.map(str::trim).filter(|value| !value.is_empty()) {
        argv.push("-s".to_string());
        argv.push(serial.to_string());
    }
    argv.extend(args.iter().cloned());
    argv
}

/// Spawns the tool and drains stdout and stderr on two concurrent tasks so a
/// chatty child can never block on a full pipe. Returns the raw stdout bytes
/// alongside the decoded result.
pub(crate) async fn execute_raw(
    adb_path: &str,
    serial: Option<&str>,
    args: &[String],
) -> Result<(CommandResult, Vec<u8>), AdbError> {
    let executable = normalize_adb_path(adb_path);
    let argv = build_adb_argv(serial, args);
    let command_text = std::iter::once(executable.as_str())
        .chain(argv.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");

    let mut command = Command::new(&executable);
    command
        .args(&argv)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|error| {
        AdbError::LaunchFailure(format!(
            "Unable to launch adb. Check path: {executable} ({error})"
        ))
    })?;

    let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
        let _ = child.kill().await;
        return Err(AdbError::LaunchFailure(format!(
            "Failed to capture output pipes for {executable}"
        )));
    };

    let stdout_task = tokio::spawn(async move {
        let mut out = Vec::new();
        stdout.read_to_end(&mut out).await.map(|_| out)
    });
    let stderr_task = tokio::spawn(async move {
        let mut out = Vec::new();
        stderr.read_to_end(&mut out).await.map(|_| out)
    });

    let wait_result = child.wait().await;
    let stdout_read = join_drain(stdout_task, "stdout", &executable).await;
    let stderr_read = join_drain(stderr_task, "stderr", &executable).await;

    let exit_status = wait_result.map_err(|error| {
        AdbError::LaunchFailure(format!("Failed to wait for {executable}: {error}"))
    })?;
    let stdout_bytes = stdout_read?;
    let stderr_bytes = stderr_read?;

    let result = CommandResult {
        command: command_text,
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        status: exit_status.code().unwrap_or(-1),
    };

    tracing::debug!(
        command = %result.command,
        status = result.status,
        stdout_bytes = stdout_bytes.len(),
        stderr_bytes = stderr_bytes.len(),
        "adb invocation finished"
    );

    if result.status != 0 {
        return Err(AdbError::CommandFailed(result));
    }

    Ok((result, stdout_bytes))
}

/// A failed read would truncate the capture, so it fails the call.
async fn join_drain(
    task: JoinHandle<std::io::Result<Vec<u8>>>,
    stream: &str,
    executable: &str,
) -> Result<Vec<u8>, AdbError> {
    match task.await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(error)) => Err(AdbError::LaunchFailure(format!(
            "Failed to read {stream} of {executable}: {error}"
        ))),
        Err(error) => Err(AdbError::LaunchFailure(format!(
            "Lost the {stream} reader of {executable}: {error}"
        ))),
    }
}

pub(crate) async fn execute(
    adb_path: &str,
    serial: Option<&str>,
    args: &[String],
) -> Result<CommandResult, AdbError> {
    execute_raw(adb_path, serial, args)
        .await
        .map(|(result, _)| result)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn blank_adb_path_falls_back_to_bare_name() {
        assert_eq!(normalize_adb_path("   "), "adb");
        assert_eq!(normalize_adb_path(" /usr/bin/adb "), "/usr/bin/adb");
    }

    #[test]
    fn serial_flag_precedes_arguments() {
        assert_eq!(
            build_adb_argv(Some("emulator-5554"), &strings(&["shell", "ls"])),
            strings(&["-s", "emulator-5554", "shell", "ls"])
        );
        assert_eq!(build_adb_argv(Some("  "), &strings(&["devices"])), strings(&["devices"]));
        assert_eq!(build_adb_argv(None, &strings(&["devices"])), strings(&["devices"]));
    }

    #[tokio::test]
    async fn missing_executable_is_a_launch_failure() {
        let error = execute("/nonexistent/adb-desk/adb", None, &strings(&["devices"]))
            .await
            .unwrap_err();
        assert!(matches!(error, AdbError::LaunchFailure(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_both_streams_on_success() {
        let result = execute("sh", None, &strings(&["-c", "echo out; echo err >&2"]))
            .await
            .expect("sh runs");
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.status, 0);
        assert_eq!(result.command, "sh -c echo out; echo err >&2");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_carries_full_result() {
        let error = execute("sh", None, &strings(&["-c", "echo partial; echo boom >&2; exit 3"]))
            .await
            .unwrap_err();
        let AdbError::CommandFailed(result) = error else {
            panic!("expected CommandFailed");
        };
        assert_eq!(result.status, 3);
        assert_eq!(result.stdout, "partial\n");
        assert_eq!(result.stderr, "boom\n");
    }

    #[tokio::test]
    async fn stream_read_error_fails_the_call() {
        let task = tokio::spawn(async {
            Err::<Vec<u8>, _>(std::io::Error::new(std::io::ErrorKind::Other, "pipe reset"))
        });
        let error = join_drain(task, "stdout", "adb").await.unwrap_err();
        let AdbError::LaunchFailure(message) = error else {
            panic!("expected LaunchFailure");
        };
        assert_eq!(message, "Failed to read stdout of adb: pipe reset");

        let task = tokio::spawn(async { Ok::<_, std::io::Error>(b"ok".to_vec()) });
        assert_eq!(join_drain(task, "stderr", "adb").await.expect("read"), b"ok");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn drains_large_output_on_both_streams() {
        let script = "head -c 400000 /dev/zero | tr '\\0' a; head -c 400000 /dev/zero | tr '\\0' b >&2";
        let (result, raw) = execute_raw("sh", None, &strings(&["-c", script]))
            .await
            .expect("sh runs");
        assert_eq!(raw.len(), 400_000);
        assert_eq!(result.stderr.len(), 400_000);
    }
}
