use clap::{Args, Parser, Subcommand};
use tokio::task::JoinHandle;

use crate::backend::app_state_management::session_runtime::{AppSession, SessionSnapshot};
use crate::backend::common::dtos::RebootMode;
use crate::paths::remote_parent_directory;

#[derive(Parser, Debug)]
#[command(name = "adb-desk", version, about = "Desktop bridge over the adb command-line tool")]
pub(crate) struct Cli {
    /// adb executable (overrides ADB_PATH and the settings file)
    #[arg(long, global = true)]
    pub(crate) adb: Option<String>,

    /// Device serial; defaults to the first attached device
    #[arg(long, short = 's', global = true)]
    pub(crate) serial: Option<String>,

    /// Print the whole session state as JSON after the operation
    #[arg(long, global = true)]
    pub(crate) json: bool,

    #[command(subcommand)]
    pub(crate) command: DeskCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeskCommand {
    /// List attached devices
    Devices,
    /// Connect to a device over TCP
    Connect { host: Option<String> },
    /// Disconnect one host, or every host when none is given
    Disconnect { host: Option<String> },
    /// Restart adbd on the device in TCP mode
    Tcpip { port: Option<String> },
    /// Reboot into system, recovery, bootloader or sideload
    Reboot {
        #[arg(default_value = "system")]
        mode: RebootMode,
    },
    /// Install an apk
    Install {
        apk: String,
        #[arg(long)]
        no_replace: bool,
    },
    /// Uninstall a package
    Uninstall {
        package: String,
        #[arg(long)]
        keep_data: bool,
    },
    /// List installed packages, optionally filtered
    Packages { filter: Option<String> },
    /// Launch a package, optionally at a specific activity
    Launch {
        package: String,
        activity: Option<String>,
    },
    /// Force-stop a package
    Stop { package: String },
    /// Copy a host path to the device
    Push { local: String, remote: String },
    /// Copy a device path to the host
    Pull { remote: String, local: String },
    /// Save a PNG screenshot
    Screenshot { path: String },
    /// Record the screen to an mp4
    Record {
        path: String,
        #[arg(long)]
        seconds: Option<u32>,
    },
    /// List a device directory
    Ls { path: Option<String> },
    /// List a host directory
    Local { path: Option<String> },
    /// Upload host paths into a device directory
    Upload {
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Download a device path into a host directory
    Download {
        remote: String,
        #[arg(long)]
        to: Option<String>,
    },
    /// Delete a device path
    Rm { path: String },
    /// Rename a device path within its directory
    Rename { path: String, new_name: String },
    /// Input method management
    #[command(subcommand)]
    Ime(ImeCommand),
    /// Type text through the ADB keyboard
    Type { text: String },
    /// Clear the focused text field through the ADB keyboard
    ClearText,
    /// Send a key code
    Key { code: String },
    /// Press the home key
    Home,
    /// Press the back key
    Back,
    /// Open the recent apps switcher
    Recents,
    /// Send an editor action code
    EditorAction { code: String },
    /// Send comma-separated unicode code points
    Unicode { codes: String },
    /// Send an ADB keyboard meta code
    Meta { code: String },
    /// Port forwarding rules
    #[command(subcommand)]
    Forward(RuleCommand),
    /// Reverse port forwarding rules
    #[command(subcommand)]
    Reverse(RuleCommand),
    /// Run a shell command on the device
    Shell {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
    /// Dump or clear logcat
    Logcat {
        #[arg(long)]
        clear: bool,
    },
    /// Show the adb binary resolution and settings
    Doctor,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImeCommand {
    /// List input methods with their state
    List,
    /// Switch to an input method
    Switch { id: String },
    /// Switch to the ADB keyboard
    AdbKeyboard,
    /// Enable the ADB keyboard
    EnableAdbKeyboard,
    /// Install the ADB keyboard apk
    InstallAdbKeyboard { apk: String },
    /// Reset to the default input method
    Reset,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum RuleCommand {
    /// List rules
    List,
    /// Add a rule
    Add(RuleArgs),
    /// Remove the rule for a port
    Remove { port: String },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub(crate) struct RuleArgs {
    pub(crate) from: String,
    pub(crate) to: String,
}

impl DeskCommand {
    pub(crate) fn needs_device(&self) -> bool {
        !matches!(
            self,
            DeskCommand::Devices
                | DeskCommand::Connect { .. }
                | DeskCommand::Disconnect { .. }
                | DeskCommand::Local { .. }
                | DeskCommand::Doctor
        )
    }

    /// Commands answered on the spot rather than through the scheduler.
    pub(crate) fn is_immediate(&self) -> bool {
        matches!(self, DeskCommand::Local { .. } | DeskCommand::Doctor)
    }
}

/// Maps one parsed command onto the matching session action.
pub(crate) fn dispatch_command(session: &AppSession, command: &DeskCommand) -> Option<JoinHandle<()>> {
    match command {
        DeskCommand::Devices => session.refresh_devices(),
        DeskCommand::Connect { host } => {
            let host = host
                .clone()
                .unwrap_or_else(|| session.settings.connection_host.clone());
            session.connect(&host)
        }
        DeskCommand::Disconnect { host } => session.disconnect(host.as_deref()),
        DeskCommand::Tcpip { port } => {
            let port = port
                .clone()
                .unwrap_or_else(|| session.settings.tcpip_port.clone());
            session.tcpip(&port)
        }
        DeskCommand::Reboot { mode } => session.reboot(*mode),
        DeskCommand::Install { apk, no_replace } => {
            session.install_apk(apk, session.settings.install_replace && !no_replace)
        }
        DeskCommand::Uninstall { package, keep_data } => session.uninstall(package, *keep_data),
        DeskCommand::Packages { .. } => session.load_packages(),
        DeskCommand::Launch { package, activity } => session.launch_app(package, activity.as_deref()),
        DeskCommand::Stop { package } => session.stop_app(package),
        DeskCommand::Push { local, remote } => session.push_file(local, remote),
        DeskCommand::Pull { remote, local } => session.pull_file(remote, local),
        DeskCommand::Screenshot { path } => session.capture_screenshot(path),
        DeskCommand::Record { path, seconds } => session.record_screen(path, *seconds),
        DeskCommand::Ls { path } => match path {
            Some(path) => session.load_remote_directory(path),
            None => session.reload_remote_directory(),
        },
        DeskCommand::Local { path } => {
            match path {
                Some(path) => session.load_local_directory(path),
                None => session.reload_local_directory(),
            }
            None
        }
        DeskCommand::Upload { paths, to } => {
            if let Some(directory) = to {
                session.reset_remote_navigation(Some(directory));
            }
            session.upload_to_remote_directory(paths)
        }
        DeskCommand::Download { remote, to } => {
            let local = to
                .clone()
                .unwrap_or_else(|| session.snapshot().state.local_directory);
            session.download_remote_entry(remote, &local)
        }
        DeskCommand::Rm { path } => {
            session.reset_remote_navigation(Some(&remote_parent_directory(path)));
            session.delete_remote_entry(path)
        }
        DeskCommand::Rename { path, new_name } => {
            session.reset_remote_navigation(Some(&remote_parent_directory(path)));
            session.rename_remote_entry(path, new_name)
        }
        DeskCommand::Ime(ime) => match ime {
            ImeCommand::List => session.load_input_methods(),
            ImeCommand::Switch { id } => session.switch_input_method_to(id, "switch input method"),
            ImeCommand::AdbKeyboard => session.switch_to_adb_keyboard(),
            ImeCommand::EnableAdbKeyboard => session.enable_adb_keyboard(),
            ImeCommand::InstallAdbKeyboard { apk } => session.install_adb_keyboard(apk),
            ImeCommand::Reset => session.reset_input_method(),
        },
        DeskCommand::Type { text } => {
            session.set_keyboard_text(text);
            session.send_keyboard_text()
        }
        DeskCommand::ClearText => session.clear_keyboard_text(),
        DeskCommand::Key { code } => session.send_key_event(code),
        DeskCommand::Home => session.send_system_key(3, "home"),
        DeskCommand::Back => session.send_system_key(4, "back"),
        DeskCommand::Recents => session.send_system_key(187, "recents"),
        DeskCommand::EditorAction { code } => session.send_editor_action(code),
        DeskCommand::Unicode { codes } => session.send_unicode_codes(codes),
        DeskCommand::Meta { code } => session.send_meta_code(code),
        DeskCommand::Forward(rule) => match rule {
            RuleCommand::List => session.refresh_forward_rules(),
            RuleCommand::Add(args) => session.add_forward(&args.from, &args.to),
            RuleCommand::Remove { port } => session.remove_forward(port),
        },
        DeskCommand::Reverse(rule) => match rule {
            RuleCommand::List => session.refresh_reverse_rules(),
            RuleCommand::Add(args) => session.add_reverse(&args.from, &args.to),
            RuleCommand::Remove { port } => session.remove_reverse(port),
        },
        DeskCommand::Shell { command } => session.run_shell(&command.join(" ")),
        DeskCommand::Logcat { clear } => {
            if *clear {
                session.clear_logcat()
            } else {
                session.fetch_logcat()
            }
        }
        DeskCommand::Doctor => None,
    }
}

/// Plain-text view of the state the command produced.
pub(crate) fn render_projection(command: &DeskCommand, snapshot: &SessionSnapshot) -> Vec<String> {
    let state = &snapshot.state;
    match command {
        DeskCommand::Devices => state
            .devices
            .iter()
            .map(|device| {
                let marker = if device.serial == state.selected_serial { "*" } else { " " };
                format!("{marker} {}  {}", device.display_name(), device.subtitle())
            })
            .collect(),
        DeskCommand::Packages { filter } => {
            crate::adb_output::filter_packages(&state.packages, filter.as_deref().unwrap_or_default())
        }
        DeskCommand::Ls { .. } | DeskCommand::Rm { .. } | DeskCommand::Rename { .. } | DeskCommand::Upload { .. } => {
            let mut lines = vec![format!("# {}", state.remote_history.current())];
            lines.extend(state.remote_entries.iter().map(|entry| entry.display_name()));
            lines
        }
        DeskCommand::Local { .. } => {
            let mut lines = vec![format!("# {}", state.local_directory)];
            lines.extend(state.local_entries.iter().map(|entry| {
                if entry.is_directory {
                    format!("{}/", entry.name)
                } else {
                    entry.name.clone()
                }
            }));
            lines
        }
        DeskCommand::Ime(_) => state
            .input_method_entries
            .iter()
            .map(|entry| format!("{} [{}]", entry.id, entry.state_label()))
            .collect(),
        DeskCommand::Forward(RuleCommand::List) => state.forward_rules.clone(),
        DeskCommand::Reverse(RuleCommand::List) => state.reverse_rules.clone(),
        DeskCommand::Shell { .. } => vec![state.shell_output.trim_end().to_string()],
        DeskCommand::Logcat { clear: false } => vec![state.logcat_output.trim_end().to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Cli {
        Cli::try_parse_from(argv).expect("parses")
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = parse(&["adb-desk", "ls", "/sdcard", "-s", "emulator-5554", "--json"]);
        assert_eq!(cli.serial.as_deref(), Some("emulator-5554"));
        assert!(cli.json);
        assert_eq!(
            cli.command,
            DeskCommand::Ls {
                path: Some("/sdcard".to_string())
            }
        );
    }

    #[test]
    fn reboot_mode_parses_through_from_str() {
        let cli = parse(&["adb-desk", "reboot", "bootloader"]);
        assert_eq!(
            cli.command,
            DeskCommand::Reboot {
                mode: RebootMode::Bootloader
            }
        );
        assert!(Cli::try_parse_from(["adb-desk", "reboot", "fastboot"]).is_err());
        assert_eq!(
            parse(&["adb-desk", "reboot"]).command,
            DeskCommand::Reboot {
                mode: RebootMode::System
            }
        );
    }

    #[test]
    fn shell_keeps_trailing_words_and_flags() {
        let cli = parse(&["adb-desk", "shell", "ls", "-l", "/sdcard"]);
        assert_eq!(
            cli.command,
            DeskCommand::Shell {
                command: vec!["ls".to_string(), "-l".to_string(), "/sdcard".to_string()]
            }
        );
    }

    #[test]
    fn rule_subcommands_parse() {
        let cli = parse(&["adb-desk", "forward", "add", "tcp:8080", "tcp:80"]);
        assert_eq!(
            cli.command,
            DeskCommand::Forward(RuleCommand::Add(RuleArgs {
                from: "tcp:8080".to_string(),
                to: "tcp:80".to_string()
            }))
        );
    }

    #[test]
    fn host_commands_do_not_need_a_device() {
        assert!(!DeskCommand::Devices.needs_device());
        assert!(!DeskCommand::Connect { host: None }.needs_device());
        assert!(DeskCommand::Ls { path: None }.needs_device());
        assert!(DeskCommand::Doctor.is_immediate());
    }
}
