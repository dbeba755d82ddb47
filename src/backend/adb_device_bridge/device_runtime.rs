use super::{owned_args, AdbService, AdbTarget};
use crate::adb_output::{parse_device_list, parse_package_list};
use crate::backend::common::dtos::{Device, RebootMode};
use crate::backend::common::errors::AdbError;
use crate::shell_command::quote_remote_argument;

impl AdbService {
    pub(crate) async fn list_devices(&self, adb_path: &str) -> Result<Vec<Device>, AdbError> {
        let output = self
            .stdout(&AdbTarget::host(adb_path), &["devices", "-l"])
            .await?;
        Ok(parse_device_list(&output))
    }

    pub(crate) async fn connect(&self, adb_path: &str, host: &str) -> Result<String, AdbError> {
        self.stdout(&AdbTarget::host(adb_path), &["connect", host])
            .await
    }

    pub(crate) async fn disconnect(
        &self,
        adb_path: &str,
        host: Option<&str>,
    ) -> Result<String, AdbError> {
        let target = AdbTarget::host(adb_path);
        match host.map(str::trim).filter(|value| !value.is_empty()) {
            Some(host) => self.stdout(&target, &["disconnect", host]).await,
            None => self.stdout(&target, &["disconnect"]).await,
        }
    }

    pub(crate) async fn tcpip(&self, target: &AdbTarget, port: &str) -> Result<String, AdbError> {
        self.stdout(target, &["tcpip", port]).await
    }

    pub(crate) async fn reboot(
        &self,
        target: &AdbTarget,
        mode: RebootMode,
    ) -> Result<String, AdbError> {
        self.execute(target, &mode.adb_args())
            .await
            .map(|result| result.stdout)
    }

    pub(crate) async fn install(
        &self,
        target: &AdbTarget,
        apk_path: &str,
        replace: bool,
    ) -> Result<String, AdbError> {
        let mut args = vec!["install"];
        if replace {
            args.push("-r");
        }
        args.push(apk_path);
        self.stdout(target, &args).await
    }

    pub(crate) async fn uninstall(
        &self,
        target: &AdbTarget,
        package_name: &str,
        keep_data: bool,
    ) -> Result<String, AdbError> {
        let mut args = vec!["uninstall"];
        if keep_data {
            args.push("-k");
        }
        args.push(package_name);
        self.stdout(target, &args).await
    }

    pub(crate) async fn list_packages(&self, target: &AdbTarget) -> Result<Vec<String>, AdbError> {
        let output = self
            .stdout(target, &["shell", "pm", "list", "packages"])
            .await?;
        Ok(parse_package_list(&output))
    }

    pub(crate) async fn launch(
        &self,
        target: &AdbTarget,
        package_name: &str,
        activity: Option<&str>,
    ) -> Result<String, AdbError> {
        match activity.map(str::trim).filter(|value| !value.is_empty()) {
            Some(activity) => {
                let component = quote_remote_argument(&format!("{package_name}/{activity}"));
                self.stdout(target, &["shell", "am", "start", "-n", &component])
                    .await
            }
            None => {
                let package_name = quote_remote_argument(package_name);
                self.stdout(
                    target,
                    &[
                        "shell",
                        "monkey",
                        "-p",
                        &package_name,
                        "-c",
                        "android.intent.category.LAUNCHER",
                        "1",
                    ],
                )
                .await
            }
        }
    }

    pub(crate) async fn stop(&self, target: &AdbTarget, package_name: &str) -> Result<String, AdbError> {
        let package_name = quote_remote_argument(package_name);
        self.stdout(target, &["shell", "am", "force-stop", &package_name])
            .await
    }

    pub(crate) async fn push(
        &self,
        target: &AdbTarget,
        local_path: &str,
        remote_path: &str,
    ) -> Result<String, AdbError> {
        self.execute(target, &owned_args(&["push", local_path, remote_path]))
            .await
            .map(|result| result.stdout)
    }

    pub(crate) async fn pull(
        &self,
        target: &AdbTarget,
        remote_path: &str,
        local_path: &str,
    ) -> Result<String, AdbError> {
        self.stdout(target, &["pull", remote_path, local_path])
            .await
    }
}
