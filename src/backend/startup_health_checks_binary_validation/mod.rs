pub(crate) mod binary_runtime;
pub(crate) mod startup_scope;
