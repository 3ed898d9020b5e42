pub(crate) mod batch;
pub(crate) mod solve;
