pub(crate) mod cli_commands;
pub(crate) mod command_entry;
