use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use super::cli_commands::{dispatch_command, render_projection, Cli, DeskCommand};
use crate::backend::adb_device_bridge::AdbService;
use crate::backend::app_state_management::session_runtime::AppSession;
use crate::backend::common::constants::LOG_FILTER_ENV;
use crate::backend::desk_settings::settings_runtime::{ensure_settings, settings_file, DeskSettings};
use crate::backend::startup_health_checks_binary_validation::binary_runtime::{
    evaluate_adb_bin_check_status, resolve_adb_binary, AdbBinCheckStatus,
};
use crate::backend::startup_health_checks_binary_validation::startup_scope::invalid_bin_warning;

pub(crate) fn run() {
    init_tracing();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("[startup-error] failed to start async runtime: {error}");
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(execute(cli));
    std::process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();
}

fn load_settings() -> DeskSettings {
    let loaded = settings_file().and_then(|path| ensure_settings(&path));
    match loaded {
        Ok(settings) => settings,
        Err(error) => {
            tracing::warn!(%error, "falling back to default settings");
            DeskSettings::default()
        }
    }
}

/// `--adb` wins over the settings file, which wins over discovery.
fn effective_adb_path(cli: &Cli, settings: &DeskSettings) -> String {
    cli.adb
        .as_deref()
        .or(settings.adb_path.as_deref())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| resolve_adb_binary().path.to_string_lossy().into_owned())
}

async fn execute(cli: Cli) -> i32 {
    let status = evaluate_adb_bin_check_status();
    if let Some(warning) = invalid_bin_warning(&status) {
        eprintln!("[startup-warning] {warning}");
    }

    let settings = load_settings();
    let adb_path = effective_adb_path(&cli, &settings);
    tracing::debug!(adb_path = %adb_path, "resolved adb binary");

    if cli.command == DeskCommand::Doctor {
        return print_doctor(&status, &settings, &adb_path);
    }

    let session = AppSession::new(AdbService::with_process_runner(), settings, &adb_path);
    if cli.command.needs_device() {
        match cli.serial.as_deref() {
            Some(serial) => session.select_device(serial),
            None => {
                if let Some(handle) = session.refresh_devices() {
                    let _ = handle.await;
                }
            }
        }
    }
    session.scheduler.clear_log();

    let handle = dispatch_command(&session, &cli.command);
    let dispatched = handle.is_some();
    if let Some(handle) = handle {
        if let Err(error) = handle.await {
            tracing::error!(%error, "operation task failed");
        }
    }

    let snapshot = session.snapshot();
    for line in &snapshot.operation.log {
        println!("{line}");
    }

    if cli.json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(text) => println!("{text}"),
            Err(error) => eprintln!("failed to encode session state: {error}"),
        }
    } else {
        for line in render_projection(&cli.command, &snapshot) {
            println!("{line}");
        }
    }

    if snapshot.operation.status.starts_with("error:") {
        1
    } else if !dispatched && !cli.command.is_immediate() {
        2
    } else {
        0
    }
}

fn print_doctor(status: &AdbBinCheckStatus, settings: &DeskSettings, adb_path: &str) -> i32 {
    let report = json!({
        "adbBinary": status,
        "effectiveAdbPath": adb_path,
        "settingsFile": settings_file().ok().map(|path| path.display().to_string()),
        "settings": settings,
    });

    match serde_json::to_string_pretty(&report) {
        Ok(text) => {
            println!("{text}");
            if status.has_issue {
                1
            } else {
                0
            }
        }
        Err(error) => {
            eprintln!("failed to encode doctor report: {error}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_adb_flag_beats_settings() {
        let cli = Cli::try_parse_from(["adb-desk", "--adb", "/opt/adb", "devices"]).expect("parses");
        let settings = DeskSettings {
            adb_path: Some("/usr/bin/adb".to_string()),
            ..DeskSettings::default()
        };
        assert_eq!(effective_adb_path(&cli, &settings), "/opt/adb");
    }

    #[test]
    fn settings_adb_path_beats_discovery() {
        let cli = Cli::try_parse_from(["adb-desk", "devices"]).expect("parses");
        let settings = DeskSettings {
            adb_path: Some(" /usr/bin/adb ".to_string()),
            ..DeskSettings::default()
        };
        assert_eq!(effective_adb_path(&cli, &settings), "/usr/bin/adb");
    }
}
