use std::path::Path;

use walkdir::WalkDir;

use super::{owned_args, AdbService, AdbTarget};
use crate::adb_output::{natural_name_cmp, parse_remote_listing, parse_rule_lines};
use crate::backend::common::constants::SCREEN_RECORD_REMOTE_PATH;
use crate::backend::common::dtos::{LocalPathEntry, RemotePathEntry};
use crate::backend::common::errors::AdbError;
use crate::backend::desk_settings::settings_runtime::clamp_screen_record_seconds;
use crate::paths::{
    ensure_not_remote_root, normalize_local_directory_path, normalize_remote_directory_path,
    normalize_remote_item_path,
};
use crate::shell_command::shell_quote;

impl AdbService {
    pub(crate) async fn list_remote_entries(
        &self,
        target: &AdbTarget,
        directory: &str,
    ) -> Result<Vec<RemotePathEntry>, AdbError> {
        let directory = normalize_remote_directory_path(directory);
        let quoted = shell_quote(&directory);
        let output = self
            .stdout(target, &["shell", "ls", "-1", "-p", &quoted])
            .await?;
        Ok(parse_remote_listing(&output, &directory))
    }

    pub(crate) async fn delete_remote_path(
        &self,
        target: &AdbTarget,
        path: &str,
    ) -> Result<String, AdbError> {
        let path = ensure_not_remote_root(path, "delete").map_err(AdbError::InvalidResponse)?;
        let quoted = shell_quote(&path);
        self.stdout(target, &["shell", "rm", "-rf", &quoted]).await
    }

    pub(crate) async fn rename_remote_path(
        &self,
        target: &AdbTarget,
        from: &str,
        to: &str,
    ) -> Result<String, AdbError> {
        let source = ensure_not_remote_root(from, "rename").map_err(AdbError::InvalidResponse)?;
        let destination = normalize_remote_item_path(to);
        let quoted_source = shell_quote(&source);
        let quoted_destination = shell_quote(&destination);
        self.stdout(target, &["shell", "mv", &quoted_source, &quoted_destination])
            .await
    }

    pub(crate) async fn screenshot(
        &self,
        target: &AdbTarget,
        save_path: &Path,
    ) -> Result<(), AdbError> {
        let (_, png) = self
            .execute_raw(target, &owned_args(&["exec-out", "screencap", "-p"]))
            .await?;
        if png.is_empty() {
            return Err(AdbError::InvalidResponse(
                "Screenshot command returned empty data".to_string(),
            ));
        }

        tokio::fs::write(save_path, &png).await?;
        Ok(())
    }

    pub(crate) async fn screen_record(
        &self,
        target: &AdbTarget,
        save_path: &Path,
        seconds: u32,
    ) -> Result<String, AdbError> {
        let seconds = clamp_screen_record_seconds(seconds).to_string();
        let local = save_path.to_string_lossy().to_string();

        self.stdout(
            target,
            &[
                "shell",
                "screenrecord",
                "--time-limit",
                &seconds,
                SCREEN_RECORD_REMOTE_PATH,
            ],
        )
        .await?;
        self.stdout(target, &["pull", SCREEN_RECORD_REMOTE_PATH, &local])
            .await?;

        if let Err(error) = self
            .stdout(target, &["shell", "rm", "-f", SCREEN_RECORD_REMOTE_PATH])
            .await
        {
            tracing::warn!(%error, path = SCREEN_RECORD_REMOTE_PATH, "remote recording cleanup failed");
        }

        Ok(format!("Saved to {local}"))
    }

    pub(crate) async fn forward(
        &self,
        target: &AdbTarget,
        local: &str,
        remote: &str,
    ) -> Result<String, AdbError> {
        self.stdout(target, &["forward", local, remote]).await
    }

    pub(crate) async fn remove_forward(&self, target: &AdbTarget, local: &str) -> Result<String, AdbError> {
        self.stdout(target, &["forward", "--remove", local]).await
    }

    pub(crate) async fn list_forward(&self, target: &AdbTarget) -> Result<Vec<String>, AdbError> {
        let output = self.stdout(target, &["forward", "--list"]).await?;
        Ok(parse_rule_lines(&output))
    }

    pub(crate) async fn reverse(
        &self,
        target: &AdbTarget,
        remote: &str,
        local: &str,
    ) -> Result<String, AdbError> {
        self.stdout(target, &["reverse", remote, local]).await
    }

    pub(crate) async fn remove_reverse(&self, target: &AdbTarget, remote: &str) -> Result<String, AdbError> {
        self.stdout(target, &["reverse", "--remove", remote]).await
    }

    pub(crate) async fn list_reverse(&self, target: &AdbTarget) -> Result<Vec<String>, AdbError> {
        let output = self.stdout(target, &["reverse", "--list"]).await?;
        Ok(parse_rule_lines(&output))
    }
}

/// Non-hidden children of a host directory, directories first.
pub(crate) fn read_local_path_entries(directory: &str) -> Result<Vec<LocalPathEntry>, AdbError> {
    let directory = normalize_local_directory_path(directory);
    let mut entries = Vec::new();

    for entry in WalkDir::new(&directory).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|error| {
            AdbError::LocalIo(
                error
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;

        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }

        let is_directory = entry.file_type().is_dir()
            || (entry.path_is_symlink() && entry.path().is_dir());
        let full_path = if is_directory {
            normalize_local_directory_path(&entry.path().to_string_lossy())
        } else {
            entry.path().to_string_lossy().to_string()
        };

        entries.push(LocalPathEntry {
            name,
            full_path,
            is_directory,
        });
    }

    entries.sort_by(|left, right| {
        right
            .is_directory
            .cmp(&left.is_directory)
            .then_with(|| natural_name_cmp(&left.name, &right.name))
    });
    Ok(entries)
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
    async fn lists_remote_directory_with_quoted_path() {
        let runner = ScriptedRunner::new(|_| Ok("b.txt\nDCIM/\n.\n..\na 2.txt\na 10.txt\n".to_string()));
        let calls = runner.call_log();
        let service = AdbService::new(Arc::new(runner));

        let entries = service
            .list_remote_entries(&target(), "sdcard/My Files")
            .await
            .expect("listing");

        assert_eq!(
            calls.lock().unwrap()[0],
            args(&["shell", "ls", "-1", "-p", "'/sdcard/My Files/'"])
        );
        let names = entries.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["DCIM", "a 2.txt", "a 10.txt", "b.txt"]);
        assert_eq!(entries[0].full_path, "/sdcard/My Files/DCIM/");
    }

    #[tokio::test]
    async fn refuses_to_delete_or_rename_root() {
        let runner = ScriptedRunner::new(|_| Ok(String::new()));
        let calls = runner.call_log();
        let service = AdbService::new(Arc::new(runner));

        let error = service.delete_remote_path(&target(), "/").await.unwrap_err();
        assert!(matches!(error, AdbError::InvalidResponse(ref message) if message == "Refusing to delete root directory"));
        let error = service
            .rename_remote_path(&target(), "", "/sdcard/x")
            .await
            .unwrap_err();
        assert!(matches!(error, AdbError::InvalidResponse(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_and_rename_quote_their_paths() {
        let runner = ScriptedRunner::new(|_| Ok(String::new()));
        let calls = runner.call_log();
        let service = AdbService::new(Arc::new(runner));

        service
            .delete_remote_path(&target(), "/sdcard/it's/")
            .await
            .expect("delete");
        service
            .rename_remote_path(&target(), "/sdcard/a", "sdcard/b c")
            .await
            .expect("rename");

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls[0], args(&["shell", "rm", "-rf", "'/sdcard/it'\"'\"'s'"]));
        assert_eq!(calls[1], args(&["shell", "mv", "'/sdcard/a'", "'/sdcard/b c'"]));
    }

    #[tokio::test]
    async fn empty_screenshot_is_rejected() {
        let service = AdbService::new(Arc::new(ScriptedRunner::new(|_| Ok(String::new()))));
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("shot.png");

        let error = service.screenshot(&target(), &path).await.unwrap_err();
        assert!(matches!(error, AdbError::InvalidResponse(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn screenshot_writes_payload() {
        let service = AdbService::new(Arc::new(ScriptedRunner::new(|_| Ok("PNGDATA".to_string()))));
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("shot.png");

        service.screenshot(&target(), &path).await.expect("screenshot");
        assert_eq!(std::fs::read(&path).expect("read"), b"PNGDATA");
    }

    #[tokio::test]
    async fn screen_record_clamps_and_tolerates_cleanup_failure() {
        let runner = ScriptedRunner::new(|argv| {
            if argv.iter().any(|arg| arg == "rm") {
                Err("rm: permission denied".to_string())
            } else {
                Ok(String::new())
            }
        });
        let calls = runner.call_log();
        let service = AdbService::new(Arc::new(runner));

        let message = service
            .screen_record(&target(), Path::new("/tmp/out.mp4"), 900)
            .await
            .expect("record");

        assert_eq!(message, "Saved to /tmp/out.mp4");
        let calls = calls.lock().unwrap().clone();
        assert_eq!(
            calls[0],
            args(&["shell", "screenrecord", "--time-limit", "180", SCREEN_RECORD_REMOTE_PATH])
        );
        assert_eq!(calls[1], args(&["pull", SCREEN_RECORD_REMOTE_PATH, "/tmp/out.mp4"]));
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn lists_forward_rules() {
        let service = AdbService::new(Arc::new(ScriptedRunner::new(|_| {
            Ok("X tcp:8080 tcp:80\n\n  X tcp:9000 tcp:9000  \n".to_string())
        })));

        let rules = service.list_forward(&target()).await.expect("rules");
        assert_eq!(rules, vec!["X tcp:8080 tcp:80", "X tcp:9000 tcp:9000"]);
    }

    #[test]
    fn local_listing_skips_hidden_and_puts_directories_first() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("file10.txt"), b"").expect("write");
        std::fs::write(temp.path().join("file2.txt"), b"").expect("write");
        std::fs::write(temp.path().join(".hidden"), b"").expect("write");
        std::fs::create_dir(temp.path().join("zdir")).expect("mkdir");

        let entries = read_local_path_entries(&temp.path().to_string_lossy()).expect("entries");
        let names = entries.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["zdir", "file2.txt", "file10.txt"]);
        assert!(entries[0].full_path.ends_with(std::path::MAIN_SEPARATOR));
    }
}
