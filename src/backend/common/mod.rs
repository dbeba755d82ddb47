pub(crate) mod constants;
pub(crate) mod dtos;
pub(crate) mod errors;
pub(crate) mod process_command;
