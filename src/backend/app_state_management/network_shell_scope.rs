use std::sync::Arc;
use tokio::task::JoinHandle;

use super::session_runtime::{output_or, required, update_state, AppSession};

impl AppSession {
    pub(crate) fn add_forward(&self, local: &str, remote: &str) -> Option<JoinHandle<()>> {
        let (target, local, remote) = self.validated(self.device_target().and_then(|target| {
            let message = "forward failed: ports must not be empty";
            Ok((target, required(local, message)?, required(remote, message)?))
        }))?;
        let service = self.service.clone();

        self.run("add forward", async move {
            let output = service.forward(&target, &local, &remote).await?;
            Ok(output_or(&output, format!("forward set: {local} -> {remote}")))
        })
    }

    pub(crate) fn remove_forward(&self, local: &str) -> Option<JoinHandle<()>> {
        let (target, local) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(local, "remove forward failed: host port is empty")?))
        }))?;
        let service = self.service.clone();

        self.run("remove forward", async move {
            let output = service.remove_forward(&target, &local).await?;
            Ok(output_or(&output, format!("forward removed: {local}")))
        })
    }

    pub(crate) fn refresh_forward_rules(&self) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("refresh forward rules", async move {
            let rules = service.list_forward(&target).await?;
            let count = rules.len();
            update_state(&state, |state| state.forward_rules = rules);
            Ok(format!("forward rules: {count}"))
        })
    }

    pub(crate) fn add_reverse(&self, remote: &str, local: &str) -> Option<JoinHandle<()>> {
        let (target, remote, local) = self.validated(self.device_target().and_then(|target| {
            let message = "reverse failed: ports must not be empty";
            Ok((target, required(remote, message)?, required(local, message)?))
        }))?;
        let service = self.service.clone();

        self.run("add reverse", async move {
            let output = service.reverse(&target, &remote, &local).await?;
            Ok(output_or(&output, format!("reverse set: {remote} -> {local}")))
        })
    }

    pub(crate) fn remove_reverse(&self, remote: &str) -> Option<JoinHandle<()>> {
        let (target, remote) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(remote, "remove reverse failed: device port is empty")?))
        }))?;
        let service = self.service.clone();

        self.run("remove reverse", async move {
            let output = service.remove_reverse(&target, &remote).await?;
            Ok(output_or(&output, format!("reverse removed: {remote}")))
        })
    }

    pub(crate) fn refresh_reverse_rules(&self) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("refresh reverse rules", async move {
            let rules = service.list_reverse(&target).await?;
            let count = rules.len();
            update_state(&state, |state| state.reverse_rules = rules);
            Ok(format!("reverse rules: {count}"))
        })
    }

    pub(crate) fn run_shell(&self, command: &str) -> Option<JoinHandle<()>> {
        let (target, command) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(command, "shell command must not be empty")?))
        }))?;
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("run shell", async move {
            let output = service.shell(&target, &command).await?;
            update_state(&state, |state| state.shell_output = output);
            Ok("shell finished".to_string())
        })
    }

    pub(crate) fn fetch_logcat(&self) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("fetch logcat", async move {
            let output = service.fetch_logcat(&target).await?;
            update_state(&state, |state| state.logcat_output = output);
            Ok("logcat fetched".to_string())
        })
    }

    pub(crate) fn clear_logcat(&self) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("clear logcat", async move {
            service.clear_logcat(&target).await?;
            update_state(&state, |state| state.logcat_output.clear());
            Ok("logcat cleared".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::app_state_management::session_runtime::test_support::{
        session_with, settle,
    };
    use crate::backend::common::process_command::test_support::{args, ScriptedRunner};

    #[tokio::test]
    async fn forward_rules_are_projected() {
        let session = session_with(ScriptedRunner::new(|_| {
            Ok("X tcp:8080 tcp:8080\n".to_string())
        }));
        session.select_device("X");

        settle(session.refresh_forward_rules()).await;
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state.forward_rules, vec!["X tcp:8080 tcp:8080"]);
        assert_eq!(snapshot.operation.status, "forward rules: 1");
    }

    #[tokio::test]
    async fn empty_ports_are_rejected() {
        let runner = ScriptedRunner::new(|_| Ok(String::new()));
        let calls = runner.call_log();
        let session = session_with(runner);
        session.select_device("X");

        assert!(session.add_reverse("tcp:1", " ").is_none());
        assert!(session.add_forward("", "tcp:1").is_none());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn shell_output_is_stored() {
        let runner = ScriptedRunner::new(|_| Ok("Pixel 6\n".to_string()));
        let calls = runner.call_log();
        let session = session_with(runner);
        session.select_device("X");

        settle(session.run_shell("getprop ro.product.model")).await;
        assert_eq!(session.snapshot().state.shell_output, "Pixel 6\n");
        assert_eq!(
            calls.lock().unwrap()[0],
            args(&["shell", "getprop", "ro.product.model"])
        );
    }

    #[tokio::test]
    async fn second_operation_is_ignored_while_first_runs() {
        let session = session_with(ScriptedRunner::new(|_| Ok("log line\n".to_string())));
        session.select_device("X");

        let first = session.fetch_logcat();
        let second = session.clear_logcat();
        assert!(second.is_none());
        settle(first).await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state.logcat_output, "log line\n");
        assert!(snapshot
            .operation
            .log
            .iter()
            .any(|line| line.ends_with("ignored: clear logcat")));
    }
}
