use std::sync::Arc;

use crate::backend::common::dtos::CommandResult;
use crate::backend::common::errors::AdbError;
use crate::backend::common::process_command::{AdbRunner, ProcessAdbRunner};

pub(crate) mod device_runtime;
pub(crate) mod file_runtime;
pub(crate) mod input_runtime;
pub(crate) mod shell_runtime;

/// Which tool binary to run and, optionally, which device to address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AdbTarget {
    pub(crate) adb_path: String,
    pub(crate) serial: Option<String>,
}

impl AdbTarget {
    pub(crate) fn host(adb_path: &str) -> Self {
        Self {
            adb_path: adb_path.to_string(),
            serial: None,
        }
    }

    pub(crate) fn device(adb_path: &str, serial: &str) -> Self {
        Self {
            adb_path: adb_path.to_string(),
            serial: Some(serial.to_string()),
        }
    }
}

/// Typed operations over the wrapped tool. Every call goes through the
/// configured runner; failures propagate unchanged.
#[derive(Clone)]
pub(crate) struct AdbService {
    runner: Arc<dyn AdbRunner>,
}

impl AdbService {
    pub(crate) fn new(runner: Arc<dyn AdbRunner>) -> Self {
        Self { runner }
    }

    pub(crate) fn with_process_runner() -> Self {
        Self::new(Arc::new(ProcessAdbRunner))
    }

    pub(crate) async fn execute_raw(
        &self,
        target: &AdbTarget,
        args: &[String],
    ) -> Result<(CommandResult, Vec<u8>), AdbError> {
        self.runner
            .run(&target.adb_path, target.serial.as_deref(), args)
            .await
    }

    pub(crate) async fn execute(
        &self,
        target: &AdbTarget,
        args: &[String],
    ) -> Result<CommandResult, AdbError> {
        self.execute_raw(target, args)
            .await
            .map(|(result, _)| result)
    }

    pub(crate) async fn stdout(&self, target: &AdbTarget, args: &[&str]) -> Result<String, AdbError> {
        self.execute(target, &owned_args(args))
            .await
            .map(|result| result.stdout)
    }
}

pub(crate) fn owned_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}
