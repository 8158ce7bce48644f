//! Application configuration and constants.
//!
//! This module provides:
//! - Operational constants (batch sizes, thresholds, retry parameters)
//! - CLI option types and parsing

pub mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel};
