use thiserror::Error;

use super::dtos::CommandResult;

#[derive(Debug, Error)]
pub(crate) enum AdbError {
    #[error("{0}")]
    LaunchFailure(String),
    #[error("{}", describe_command_failure(.0))]
    CommandFailed(CommandResult),
    #[error("{0}")]
    InvalidResponse(String),
    #[error("{0}")]
    EmptySelection(String),
    #[error("local file error: {0}")]
    LocalIo(#[from] std::io::Error),
}

fn describe_command_failure(result: &CommandResult) -> String {
    let stderr = result.stderr.trim();
    if stderr.is_empty() {
        format!("command failed ({}): {}", result.status, result.command)
    } else {
        format!("command failed ({}): {stderr}", result.status)
    }
}
