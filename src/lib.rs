mod adb_output;
mod backend;
mod navigation;
mod paths;
mod shell_command;

pub fn run() {
    backend::frontend_command_registry::command_entry::run();
}
