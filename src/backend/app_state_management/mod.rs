pub(crate) mod file_manager_scope;
pub(crate) mod input_scope;
pub(crate) mod network_shell_scope;
pub(crate) mod session_runtime;
