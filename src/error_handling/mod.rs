//! Error types and audit statistics.

mod stats;
mod types;

pub use stats::{print_audit_statistics, AuditStats};
pub use types::{
    DatabaseError, ErrorType, InfoType, InitializationError, QueueError, SuggestionStoreError,
    WarningType,
};
