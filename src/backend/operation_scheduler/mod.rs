pub(crate) mod scheduler_runtime;
