//! Shared utilities.

mod retry;

pub(crate) use retry::is_retriable_error;
