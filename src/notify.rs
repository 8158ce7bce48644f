//! Mystique notification.
//!
//! Packages the audit's synchronized broken links into batched queue messages
//! for the Mystique recommendation service, accompanied by a set of candidate
//! alternative URLs the consumer can suggest as replacements.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;

use crate::config::constants::{ALTERNATIVE_URL_DENYLIST, MYSTIQUE_BATCH_SIZE};
use crate::error_handling::{AuditStats, ErrorType, QueueError, WarningType};
use crate::locale::extract_locale_prefix;
use crate::models::{BatchInfo, MystiqueMessage, MystiquePayload, PrioritizedLink};
use crate::scope::filter_urls_by_scope;

/// Outbound queue capability. Sends are independent per message; a failed
/// send does not roll back earlier batches.
#[async_trait]
pub trait QueueSender: Send + Sync {
    async fn send(&self, message: &MystiqueMessage) -> Result<(), QueueError>;
}

/// Appends each message as one JSON line to an outbox file.
pub struct FileQueueSender {
    path: PathBuf,
}

impl FileQueueSender {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QueueSender for FileQueueSender {
    async fn send(&self, message: &MystiqueMessage) -> Result<(), QueueError> {
        let line =
            serde_json::to_string(message).map_err(|e| QueueError::Send(e.to_string()))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), QueueError> {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| QueueError::Send(format!("{}: {e}", path.display())))?;
            writeln!(file, "{line}").map_err(|e| QueueError::Send(e.to_string()))
        })
        .await
        .map_err(|e| QueueError::Send(e.to_string()))?
    }
}

/// Dry-run sender: logs message summaries instead of dispatching them.
pub struct LoggingQueueSender;

#[async_trait]
impl QueueSender for LoggingQueueSender {
    async fn send(&self, message: &MystiqueMessage) -> Result<(), QueueError> {
        info!(
            "[dry-run] Mystique message for site {}: batch {}/{} with {} links",
            message.site_id,
            message.data.batch_info.batch_index,
            message.data.batch_info.total_batches,
            message.data.broken_links.len()
        );
        Ok(())
    }
}

fn has_denied_extension(url: &str) -> bool {
    let lowered = url.to_lowercase();
    let path_end = lowered
        .find(['?', '#'])
        .map(|i| &lowered[..i])
        .unwrap_or(&lowered);
    ALTERNATIVE_URL_DENYLIST
        .iter()
        .any(|ext| path_end.ends_with(ext))
}

/// Scope- and extension-filters the site's top pages into the candidate
/// alternative-URL pool shared by all batches of one notification cycle.
fn filter_candidate_urls(base_url: &str, top_pages: &[String]) -> Vec<String> {
    let in_scope = filter_urls_by_scope(base_url, top_pages);

    let before_denylist = in_scope.len();
    let candidates: Vec<String> = in_scope
        .into_iter()
        .filter(|url| !has_denied_extension(url))
        .collect();
    let denied = before_denylist - candidates.len();
    if denied > 0 {
        debug!("Filtered out {denied} alternative URL candidates with non-scrapeable extensions");
    }
    candidates
}

/// Restricts candidates to one batch's locale.
///
/// When every broken link in the batch shares a single locale prefix, only
/// candidates under that prefix survive; with zero or multiple prefixes the
/// candidates pass through unchanged. The locale of a link is derived from
/// its target URL, falling back to its source page.
fn restrict_to_batch_locale(candidates: &[String], links: &[PrioritizedLink]) -> Vec<String> {
    let locales: BTreeSet<String> = links
        .iter()
        .map(|link| {
            let prefix = extract_locale_prefix(&link.url_to);
            if prefix.is_empty() {
                extract_locale_prefix(&link.url_from)
            } else {
                prefix
            }
        })
        .filter(|prefix| !prefix.is_empty())
        .collect();

    if locales.len() != 1 {
        return candidates.to_vec();
    }

    let locale = locales.into_iter().next().unwrap_or_default();
    let restricted: Vec<String> = candidates
        .iter()
        .filter(|url| extract_locale_prefix(url) == locale)
        .cloned()
        .collect();
    debug!(
        "Restricted alternative URLs to locale {locale}: {} of {} kept",
        restricted.len(),
        candidates.len()
    );
    restricted
}

/// Builds the alternative-URL set offered alongside one batch of broken
/// links: the site's top pages, scope- and denylist-filtered, restricted to
/// the batch's locale when it has exactly one.
pub fn build_alternative_urls(
    base_url: &str,
    links: &[PrioritizedLink],
    top_pages: &[String],
) -> Vec<String> {
    let candidates = filter_candidate_urls(base_url, top_pages);
    restrict_to_batch_locale(&candidates, links)
}

/// Sends the audit's broken links to Mystique in bounded batches.
///
/// Only sendable links (non-empty URLs with an attached suggestion id) are
/// dispatched. A missing opportunity id or an empty candidate-URL set is a
/// logged no-op, not an error. Batches draw from a shared scope- and
/// denylist-filtered candidate pool, restricted per batch to the batch's
/// locale, and each carries a `batch_info` block positioning it within the
/// cycle. Returns the number of batches sent; a send failure propagates
/// after earlier batches have already gone out.
pub async fn notify_mystique(
    queue: &dyn QueueSender,
    opportunity_id: Option<&str>,
    site_id: &str,
    audit_id: &str,
    links: &[PrioritizedLink],
    top_pages: &[String],
    site_base_url: &str,
    stats: &AuditStats,
) -> Result<usize> {
    let sendable: Vec<PrioritizedLink> = links
        .iter()
        .filter(|link| link.is_sendable())
        .cloned()
        .collect();
    if sendable.is_empty() {
        stats.increment_warning(WarningType::NoValidBrokenLinks);
        warn!("No valid broken links to send to Mystique for site {site_id}");
        return Ok(0);
    }

    let Some(opportunity_id) = opportunity_id else {
        error!("Opportunity ID is missing for site {site_id}; cannot notify Mystique");
        return Ok(0);
    };

    let candidate_urls = filter_candidate_urls(site_base_url, top_pages);
    if candidate_urls.is_empty() {
        stats.increment_warning(WarningType::NoAlternativeUrls);
        warn!("No alternative URLs available for site {site_id}; skipping Mystique notification");
        return Ok(0);
    }

    let total_broken_links = sendable.len();
    let total_batches = total_broken_links.div_ceil(MYSTIQUE_BATCH_SIZE);
    info!("Sending {total_broken_links} broken links in {total_batches} batch(es) to Mystique");

    for (index, chunk) in sendable.chunks(MYSTIQUE_BATCH_SIZE).enumerate() {
        let batch_index = index + 1;
        // The locale restriction is per batch: each batch only offers
        // alternatives matching its own links' shared locale, if any.
        let payload = MystiquePayload {
            broken_links: chunk.to_vec(),
            alternative_urls: restrict_to_batch_locale(&candidate_urls, chunk),
            site_base_url: site_base_url.to_string(),
            batch_info: BatchInfo {
                batch_index,
                total_batches,
                total_broken_links,
            },
        };
        let message = MystiqueMessage::for_batch(site_id, audit_id, opportunity_id, payload);
        debug!(
            "Sending Mystique batch {batch_index}/{total_batches} with {} links",
            chunk.len()
        );
        if let Err(e) = queue.send(&message).await {
            stats.increment_error(ErrorType::QueueSendError);
            error!("Mystique queue send failed on batch {batch_index}/{total_batches}: {e}");
            return Err(e.into());
        }
    }

    Ok(total_batches)
}
