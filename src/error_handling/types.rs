//! Error type definitions.
//!
//! This module defines the typed errors raised at collaborator boundaries and
//! the counter categories tracked across an audit run.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

/// Error raised by a suggestion-store implementation.
///
/// Store failures are fatal for the current audit run; the audit-step wrapper
/// translates them into a failed-run outcome rather than retrying.
#[derive(Error, Debug)]
pub enum SuggestionStoreError {
    /// The backing store rejected a create, update, or save call.
    #[error("Suggestion store operation failed: {0}")]
    Backend(String),

    /// The referenced opportunity does not exist.
    #[error("Opportunity not found: {0}")]
    OpportunityNotFound(String),
}

impl From<sqlx::Error> for SuggestionStoreError {
    fn from(e: sqlx::Error) -> Self {
        SuggestionStoreError::Backend(e.to_string())
    }
}

/// Error raised when a queue message cannot be dispatched.
///
/// Sends already issued for earlier batches are not rolled back; the caller
/// decides whether to fail the whole step.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The queue client rejected or failed the send.
    #[error("Queue send failed: {0}")]
    Send(String),
}

/// Types of errors that can occur during audit processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    /// The RUM analytics query failed.
    RumQueryError,
    /// A scraped page body could not be fetched from the page store.
    PageFetchError,
    /// A reachability probe failed at the network level.
    ProbeNetworkError,
    /// The suggestion store rejected a mutation.
    SuggestionStoreError,
    /// A Mystique queue send failed.
    QueueSendError,
}

/// Warning conditions: success outcomes that still deserve tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum WarningType {
    /// The RUM report returned zero rows for the window.
    EmptyRumReport,
    /// No valid broken links remained to notify Mystique about.
    NoValidBrokenLinks,
    /// No alternative URLs survived scope and extension filtering.
    NoAlternativeUrls,
}

/// Informational metrics tracked during crawl detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    /// A probe was skipped because the URL was already known broken/working.
    ProbeCacheHit,
    /// A broken link was recorded.
    BrokenLinkFound,
    /// A scraped page was skipped (empty body or unparseable page URL).
    PageSkipped,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::RumQueryError => "RUM query error",
            ErrorType::PageFetchError => "Page fetch error",
            ErrorType::ProbeNetworkError => "Probe network error",
            ErrorType::SuggestionStoreError => "Suggestion store error",
            ErrorType::QueueSendError => "Queue send error",
        }
    }
}

impl WarningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::EmptyRumReport => "Empty RUM report",
            WarningType::NoValidBrokenLinks => "No valid broken links",
            WarningType::NoAlternativeUrls => "No alternative URLs",
        }
    }
}

impl InfoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::ProbeCacheHit => "Probe cache hit",
            InfoType::BrokenLinkFound => "Broken link found",
            InfoType::PageSkipped => "Page skipped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_all_types_have_string_representation() {
        for error_type in ErrorType::iter() {
            assert!(!error_type.as_str().is_empty());
        }
        for warning_type in WarningType::iter() {
            assert!(!warning_type.as_str().is_empty());
        }
        for info_type in InfoType::iter() {
            assert!(!info_type.as_str().is_empty());
        }
    }

    #[test]
    fn test_error_type_display() {
        assert_eq!(ErrorType::RumQueryError.to_string(), "RUM query error");
        assert_eq!(ErrorType::QueueSendError.to_string(), "Queue send error");
    }

    #[test]
    fn test_suggestion_store_error_from_sqlx() {
        let err: SuggestionStoreError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, SuggestionStoreError::Backend(_)));
    }
}
