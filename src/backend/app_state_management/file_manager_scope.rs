use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::session_runtime::{lock_state, output_or, required, update_state, AppSession};
use crate::backend::adb_device_bridge::file_runtime::read_local_path_entries;
use crate::backend::common::errors::AdbError;
use crate::paths::{
    join_remote_path, local_parent_directory, normalize_local_directory_path,
    normalize_remote_directory_path, remote_parent_directory, REMOTE_ROOT,
};

/// How a remote listing load moves through history once it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteMove {
    Enter,
    Back,
    Forward,
    Reload,
}

impl AppSession {
    fn browse_remote(&self, directory: String, movement: RemoteMove) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("load device path", async move {
            let entries = service.list_remote_entries(&target, &directory).await?;
            update_state(&state, |state| {
                match movement {
                    RemoteMove::Enter => {
                        state.remote_history.navigate(&directory);
                    }
                    RemoteMove::Back => {
                        state.remote_history.back();
                    }
                    RemoteMove::Forward => {
                        state.remote_history.forward();
                    }
                    RemoteMove::Reload => {}
                }
                state.remote_entries = entries;
                state.selected_remote_path = directory.clone();
            });
            Ok(format!("loaded device path: {directory}"))
        })
    }

    pub(crate) fn remote_directory(&self) -> String {
        lock_state(&self.state).remote_history.current().to_string()
    }

    pub(crate) fn load_remote_directory(&self, path: &str) -> Option<JoinHandle<()>> {
        self.browse_remote(normalize_remote_directory_path(path), RemoteMove::Enter)
    }

    pub(crate) fn reload_remote_directory(&self) -> Option<JoinHandle<()>> {
        self.browse_remote(self.remote_directory(), RemoteMove::Reload)
    }

    pub(crate) fn remote_go_back(&self) -> Option<JoinHandle<()>> {
        let previous = lock_state(&self.state)
            .remote_history
            .peek_back()
            .map(str::to_string)?;
        self.browse_remote(previous, RemoteMove::Back)
    }

    pub(crate) fn remote_go_forward(&self) -> Option<JoinHandle<()>> {
        let next = lock_state(&self.state)
            .remote_history
            .peek_forward()
            .map(str::to_string)?;
        self.browse_remote(next, RemoteMove::Forward)
    }

    pub(crate) fn remote_go_parent(&self) -> Option<JoinHandle<()>> {
        let current = self.remote_directory();
        if current == REMOTE_ROOT {
            return None;
        }
        self.browse_remote(remote_parent_directory(&current), RemoteMove::Enter)
    }

    pub(crate) fn reset_remote_navigation(&self, path: Option<&str>) {
        update_state(&self.state, |state| state.remote_history.reset(path));
    }

    pub(crate) fn select_remote_entry(&self, path: &str) {
        update_state(&self.state, |state| {
            state.selected_remote_path = path.trim().to_string();
        });
    }

    /// Directories are entered; files are only selected.
    pub(crate) fn open_remote_entry(&self, path: &str) -> Option<JoinHandle<()>> {
        let is_directory = self.remote_entry_is_directory(path);
        if is_directory {
            self.load_remote_directory(path)
        } else {
            self.select_remote_entry(path);
            None
        }
    }

    fn remote_entry_is_directory(&self, path: &str) -> bool {
        let path = path.trim();
        lock_state(&self.state)
            .remote_entries
            .iter()
            .find(|entry| entry.full_path == path)
            .map(|entry| entry.is_directory)
            .unwrap_or_else(|| path.ends_with('/'))
    }

    pub(crate) fn load_local_directory(&self, path: &str) {
        let directory = normalize_local_directory_path(path);
        match read_local_path_entries(&directory) {
            Ok(entries) => {
                update_state(&self.state, |state| {
                    state.local_directory = directory.clone();
                    state.local_entries = entries;
                    state.selected_local_path = directory.clone();
                });
                self.report_local(&format!("loaded local path: {directory}"));
            }
            Err(error) => {
                self.report_local(&format!("error: failed to load local path: {error}"));
            }
        }
    }

    /// Local loads run outside the scheduler, so they leave a running
    /// operation's status alone.
    fn report_local(&self, message: &str) {
        if self.scheduler.is_busy() {
            self.scheduler.note(message);
        } else {
            self.scheduler.report(message);
        }
    }

    pub(crate) fn reload_local_directory(&self) {
        let current = lock_state(&self.state).local_directory.clone();
        self.load_local_directory(&current);
    }

    pub(crate) fn local_go_parent(&self) {
        let current = lock_state(&self.state).local_directory.clone();
        let parent = local_parent_directory(&current);
        if parent == normalize_local_directory_path(&current) {
            return;
        }
        self.load_local_directory(&parent);
    }

    pub(crate) fn select_local_entry(&self, path: &str) {
        update_state(&self.state, |state| {
            state.selected_local_path = path.trim().to_string();
        });
    }

    /// Pushes every distinct host path into the current remote directory, then
    /// reloads its listing.
    pub(crate) fn upload_to_remote_directory(&self, paths: &[String]) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let unique = paths
            .iter()
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .collect::<BTreeSet<_>>();
        if unique.is_empty() {
            return None;
        }

        let remote_directory = self.remote_directory();
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("upload to device", async move {
            for path in &unique {
                service.push(&target, path, &remote_directory).await?;
            }
            let entries = service
                .list_remote_entries(&target, &remote_directory)
                .await?;
            update_state(&state, |state| state.remote_entries = entries);

            if unique.len() == 1 {
                Ok(format!("uploaded to {remote_directory}"))
            } else {
                Ok(format!("uploaded {} items to {remote_directory}", unique.len()))
            }
        })
    }

    pub(crate) fn upload_selected_local(&self) -> Option<JoinHandle<()>> {
        let selected = lock_state(&self.state).selected_local_path.clone();
        let source = self.validated(required(
            &selected,
            "upload failed: select a local file or directory first",
        ))?;
        self.upload_to_remote_directory(&[source])
    }

    /// Pulls `remote_path` into `local_directory`, then refreshes the local
    /// listing when that directory is the one being browsed.
    pub(crate) fn download_remote_entry(
        &self,
        remote_path: &str,
        local_directory: &str,
    ) -> Option<JoinHandle<()>> {
        let (target, remote_source) = self.validated(self.device_target().and_then(|target| {
            Ok((
                target,
                required(remote_path, "download failed: select a device file or directory first")?,
            ))
        }))?;
        let local_target = normalize_local_directory_path(local_directory);
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("download to host", async move {
            let output = service.pull(&target, &remote_source, &local_target).await?;

            let browsing = lock_state(&state).local_directory == local_target;
            if browsing {
                let entries = read_local_path_entries(&local_target)?;
                update_state(&state, |state| state.local_entries = entries);
            }
            Ok(output_or(&output, format!("downloaded to {local_target}")))
        })
    }

    pub(crate) fn download_selected_remote(&self) -> Option<JoinHandle<()>> {
        let (selected, local_directory) = {
            let state = lock_state(&self.state);
            (state.selected_remote_path.clone(), state.local_directory.clone())
        };
        self.download_remote_entry(&selected, &local_directory)
    }

    pub(crate) fn delete_remote_entry(&self, path: &str) -> Option<JoinHandle<()>> {
        let (target, path) = self.validated(self.device_target().and_then(|target| {
            Ok((target, required(path, "delete failed: no device path selected")?))
        }))?;
        let label = lock_state(&self.state)
            .remote_entries
            .iter()
            .find(|entry| entry.full_path == path)
            .map(|entry| entry.display_name())
            .unwrap_or_else(|| path.clone());
        let current_directory = self.remote_directory();
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("delete device file", async move {
            service.delete_remote_path(&target, &path).await?;
            let entries = service
                .list_remote_entries(&target, &current_directory)
                .await?;
            update_state(&state, |state| {
                state.remote_entries = entries;
                state.selected_remote_path = current_directory.clone();
            });
            Ok(format!("deleted: {label}"))
        })
    }

    pub(crate) fn rename_remote_entry(&self, path: &str, new_name: &str) -> Option<JoinHandle<()>> {
        let target = self.validated(self.device_target())?;
        let name = self.validated(required(new_name, "rename failed: name is empty"))?;
        if name.contains('/') {
            self.scheduler.reject(&AdbError::EmptySelection(
                "rename failed: name must not contain /".to_string(),
            ));
            return None;
        }

        let path = path.trim().to_string();
        let is_directory = self.remote_entry_is_directory(&path);
        let current_name = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
        if name == current_name {
            self.scheduler.note("rename cancelled: name unchanged");
            return None;
        }

        let current_directory = self.remote_directory();
        let new_path = join_remote_path(&current_directory, &name, is_directory);
        let service = self.service.clone();
        let state = Arc::clone(&self.state);

        self.run("rename device file", async move {
            service.rename_remote_path(&target, &path, &new_path).await?;
            let entries = service
                .list_remote_entries(&target, &current_directory)
                .await?;
            update_state(&state, |state| {
                state.remote_entries = entries;
                state.selected_remote_path = new_path.clone();
            });
            Ok(format!("renamed to: {name}"))
        })
    }
}
