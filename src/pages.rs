//! Scraped-page retrieval.
//!
//! The crawl detector consumes already-scraped page bodies. The scrape store
//! is a collaborator boundary: a `PageStore` resolves an object key to HTML.
//! Fetches for a batch of keys run concurrently and fail soft — individual
//! failures are logged and excluded, and only a total failure (zero successes
//! out of nonzero attempts) aborts the batch.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};

use crate::config::constants::FETCH_RETRY_ATTEMPTS;
use crate::error_handling::{AuditStats, ErrorType};
use crate::utils::is_retriable_error;

/// Resolves scraped-page object keys to page bodies.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Fetches one scraped page body by its object key.
    async fn fetch_page(&self, key: &str) -> Result<String>;
}

/// Filesystem-backed page store: keys are paths relative to a root directory.
///
/// The scrape directory also carries a `manifest.json` mapping each page's
/// final URL to the object key holding its body.
pub struct FsPageStore {
    root: PathBuf,
}

impl FsPageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Loads the URL -> object-key manifest from the scrape directory.
    pub async fn load_manifest(&self) -> Result<BTreeMap<String, String>> {
        let manifest_path = self.root.join("manifest.json");
        let raw = tokio::fs::read_to_string(&manifest_path)
            .await
            .with_context(|| format!("Failed to read scrape manifest {}", manifest_path.display()))?;
        let manifest: BTreeMap<String, String> =
            serde_json::from_str(&raw).context("Failed to parse scrape manifest")?;
        Ok(manifest)
    }
}

#[async_trait]
impl PageStore for FsPageStore {
    async fn fetch_page(&self, key: &str) -> Result<String> {
        let path = self.root.join(key);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read scraped page {}", path.display()))
    }
}

/// Fetches one page with a fixed number of immediate re-attempts.
async fn fetch_with_retry(store: &dyn PageStore, key: &str, retries: u32) -> Result<String> {
    let mut last_err = anyhow!("no fetch attempted");
    for attempt in 0..=retries {
        match store.fetch_page(key).await {
            Ok(body) => return Ok(body),
            Err(e) => {
                if attempt < retries && is_retriable_error(&e) {
                    debug!("Retrying page fetch for key {key} after failure: {e:#}");
                    last_err = e;
                } else {
                    return Err(e);
                }
            }
        }
    }
    Err(last_err)
}

/// Fetches all scraped pages named by the manifest, concurrently and
/// fail-soft.
///
/// Returns a map of page URL to HTML body covering the successful fetches.
/// Fails only when every fetch failed; a partial result is a success with a
/// summary log.
pub async fn fetch_pages(
    store: &dyn PageStore,
    manifest: &BTreeMap<String, String>,
    stats: &AuditStats,
) -> Result<BTreeMap<String, String>> {
    if manifest.is_empty() {
        return Ok(BTreeMap::new());
    }

    let fetches = manifest.iter().map(|(url, key)| async move {
        let result = fetch_with_retry(store, key, FETCH_RETRY_ATTEMPTS).await;
        (url.clone(), key.clone(), result)
    });

    let mut pages = BTreeMap::new();
    let mut failed = 0usize;
    for (url, key, result) in join_all(fetches).await {
        match result {
            Ok(body) => {
                pages.insert(url, body);
            }
            Err(e) => {
                failed += 1;
                stats.increment_error(ErrorType::PageFetchError);
                warn!("Failed to fetch scraped page {url} (key {key}): {e:#}");
            }
        }
    }

    let total = manifest.len();
    info!(
        "Fetched scraped pages: {} successful, {} failed out of {} total",
        pages.len(),
        failed,
        total
    );

    if pages.is_empty() {
        bail!("No scraped page content available: all {total} fetches failed");
    }
    Ok(pages)
}
