//! Command handlers grouped by concern.

pub(crate) mod auth;
pub(crate) mod scan;
pub(crate) mod session;
