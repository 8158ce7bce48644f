//! Configuration constants.
//!
//! This module defines all operational constants used throughout the audit,
//! including batch sizes, priority thresholds, retry behavior, and filtering
//! rules.

/// Maximum number of scraped pages processed per crawl-detection batch.
///
/// The crawl detector is a resumable batch step: each invocation handles at
/// most this many pages and reports whether more work remains, so an external
/// orchestrator can re-enter it with persisted state.
pub const CRAWL_BATCH_SIZE: usize = 30;

/// Maximum number of broken links carried in a single Mystique queue message.
pub const MYSTIQUE_BATCH_SIZE: usize = 100;

/// Rolling time window (in days) for the RUM 404 internal-links report.
pub const RUM_WINDOW_DAYS: u32 = 30;

/// Granularity of the RUM report query.
pub const RUM_GRANULARITY: &str = "hourly";

/// Traffic threshold at or above which a broken link is `high` priority.
pub const PRIORITY_HIGH_THRESHOLD: u64 = 1000;

/// Traffic threshold at or above which a broken link is `medium` priority.
pub const PRIORITY_MEDIUM_THRESHOLD: u64 = 500;

/// Number of sequential re-attempts applied to a single failed page fetch or
/// link probe before giving up on that item. Retries are immediate, with no
/// backoff computation.
pub const FETCH_RETRY_ATTEMPTS: u32 = 1;

/// Maximum concurrent reachability probes (semaphore limit).
pub const PROBE_CONCURRENCY: usize = 30;

/// Per-request timeout in seconds for link probes and RUM queries.
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// File extensions excluded from alternative-URL candidates.
///
/// These targets cannot be scraped downstream, so offering them as
/// replacement suggestions would be useless. Matched case-insensitively.
pub const ALTERNATIVE_URL_DENYLIST: [&str; 4] = [".pdf", ".xlsx", ".pptx", ".docx"];

/// Opportunity type recorded against persisted findings.
pub const OPPORTUNITY_TYPE: &str = "broken-internal-links";

/// Message type tag carried on every Mystique queue message.
pub const MYSTIQUE_MESSAGE_TYPE: &str = "guidance:broken-internal-links";

/// Default User-Agent header for reachability probes.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Default SQLite database path for run metadata and crawl state.
pub const DB_PATH: &str = "./link_audit.db";
