pub(crate) mod adb_device_bridge;
pub(crate) mod app_state_management;
pub(crate) mod common;
pub(crate) mod desk_settings;
pub(crate) mod frontend_command_registry;
pub(crate) mod operation_scheduler;
pub(crate) mod startup_health_checks_binary_validation;
