//! Audit statistics tracking.
//!
//! Thread-safe counters for errors, warnings, and informational metrics
//! accumulated over one audit run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::info;
use strum::IntoEnumIterator;

use super::types::{ErrorType, InfoType, WarningType};

/// Thread-safe audit statistics tracker.
///
/// All counter types are initialized to zero on creation; counters use
/// atomics so the tracker can be shared across concurrent probe tasks via
/// `Arc`.
pub struct AuditStats {
    errors: HashMap<ErrorType, AtomicUsize>,
    warnings: HashMap<WarningType, AtomicUsize>,
    info: HashMap<InfoType, AtomicUsize>,
}

impl AuditStats {
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for error in ErrorType::iter() {
            errors.insert(error, AtomicUsize::new(0));
        }

        let mut warnings = HashMap::new();
        for warning in WarningType::iter() {
            warnings.insert(warning, AtomicUsize::new(0));
        }

        let mut info = HashMap::new();
        for info_type in InfoType::iter() {
            info.insert(info_type, AtomicUsize::new(0));
        }

        AuditStats {
            errors,
            warnings,
            info,
        }
    }

    /// Increment an error counter.
    pub fn increment_error(&self, error: ErrorType) {
        if let Some(counter) = self.errors.get(&error) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Increment a warning counter.
    pub fn increment_warning(&self, warning: WarningType) {
        if let Some(counter) = self.warnings.get(&warning) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Increment an info counter.
    pub fn increment_info(&self, info_type: InfoType) {
        if let Some(counter) = self.info.get(&info_type) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get the count for an error type.
    pub fn get_error_count(&self, error: ErrorType) -> usize {
        self.errors
            .get(&error)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Get the count for a warning type.
    pub fn get_warning_count(&self, warning: WarningType) -> usize {
        self.warnings
            .get(&warning)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Get the count for an info type.
    pub fn get_info_count(&self, info_type: InfoType) -> usize {
        self.info
            .get(&info_type)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Get total error count across all error types.
    pub fn total_errors(&self) -> usize {
        ErrorType::iter().map(|e| self.get_error_count(e)).sum()
    }
}

impl Default for AuditStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints non-zero counters at the end of a run.
pub fn print_audit_statistics(stats: &AuditStats) {
    for error in ErrorType::iter() {
        let count = stats.get_error_count(error);
        if count > 0 {
            info!("{}: {}", error.as_str(), count);
        }
    }
    for warning in WarningType::iter() {
        let count = stats.get_warning_count(warning);
        if count > 0 {
            info!("{}: {}", warning.as_str(), count);
        }
    }
    for info_type in InfoType::iter() {
        let count = stats.get_info_count(info_type);
        if count > 0 {
            info!("{}: {}", info_type.as_str(), count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = AuditStats::new();
        assert_eq!(stats.get_error_count(ErrorType::RumQueryError), 0);
        assert_eq!(stats.get_warning_count(WarningType::EmptyRumReport), 0);
        assert_eq!(stats.get_info_count(InfoType::ProbeCacheHit), 0);
        assert_eq!(stats.total_errors(), 0);
    }

    #[test]
    fn test_increment_and_total() {
        let stats = AuditStats::new();
        stats.increment_error(ErrorType::ProbeNetworkError);
        stats.increment_error(ErrorType::ProbeNetworkError);
        stats.increment_error(ErrorType::QueueSendError);
        stats.increment_info(InfoType::BrokenLinkFound);
        assert_eq!(stats.get_error_count(ErrorType::ProbeNetworkError), 2);
        assert_eq!(stats.get_error_count(ErrorType::QueueSendError), 1);
        assert_eq!(stats.get_info_count(InfoType::BrokenLinkFound), 1);
        assert_eq!(stats.total_errors(), 3);
    }

    #[test]
    fn test_concurrent_increments() {
        use std::sync::Arc;

        let stats = Arc::new(AuditStats::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let stats = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    stats.increment_info(InfoType::ProbeCacheHit);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.get_info_count(InfoType::ProbeCacheHit), 800);
    }
}
