pub(crate) mod settings_runtime;
