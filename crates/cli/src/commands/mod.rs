pub(crate) mod check;
pub(crate) mod format;
pub(crate) mod json;
pub(crate) mod validate;
