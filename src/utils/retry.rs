//! Error retriability classification.

use anyhow::Error;

/// Determines whether a failed fetch or probe is worth one more attempt.
///
/// Only transient network conditions qualify: timeouts, connection failures,
/// rate limiting (429), and server-side 5xx responses. Permanent client
/// errors (4xx), URL parsing errors, and database errors are never retried.
///
/// Uses error-chain inspection with downcasting rather than string matching
/// where a concrete error type is available.
pub(crate) fn is_retriable_error(error: &Error) -> bool {
    for cause in error.chain() {
        if let Some(reqwest_err) = cause.downcast_ref::<reqwest::Error>() {
            if let Some(status) = reqwest_err.status() {
                let status_code = status.as_u16();

                // 429 (Too Many Requests) is retriable with a pause
                if status_code == 429 {
                    return true;
                }

                // Permanent client errors (4xx except 429) - don't retry
                if (400..500).contains(&status_code) {
                    return false;
                }

                // Server errors (5xx) - retry (temporary)
                if (500..600).contains(&status_code) {
                    return true;
                }
            }

            if reqwest_err.is_timeout() || reqwest_err.is_connect() || reqwest_err.is_request() {
                return true;
            }

            if reqwest_err.is_redirect() || reqwest_err.is_decode() {
                return false;
            }
        }

        // URL parsing errors are permanent
        if cause.downcast_ref::<url::ParseError>().is_some() {
            return false;
        }

        // Database errors are permanent
        if cause.downcast_ref::<sqlx::Error>().is_some() {
            return false;
        }

        // Message-pattern fallback for errors from other sources
        let msg = cause.to_string().to_lowercase();
        if msg.contains("404") || msg.contains("not found") {
            return false;
        }
        if msg.contains("403") || msg.contains("forbidden") {
            return false;
        }
        if msg.contains("401") || msg.contains("unauthorized") {
            return false;
        }
    }

    // Default: retry unknown errors (might be a transient network issue)
    true
}
