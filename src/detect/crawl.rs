//! Crawl-based broken-link detection.
//!
//! Given already-scraped page bodies, extracts internal anchor links,
//! resolves them against the page's final URL, and probes each target for
//! reachability. Runs as a resumable batch step: each call processes a
//! bounded slice of pages and returns updated state, so an external
//! orchestrator can persist the state and re-enter with the next slice.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use url::Url;

use crate::error_handling::{AuditStats, ErrorType, InfoType};
use crate::models::BrokenLinkCandidate;
use crate::utils::is_retriable_error;

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href]").expect("Failed to parse anchor selector - this is a bug")
});

/// Reachability capability: probes a URL and reports whether it answers with
/// a 2xx status. `Err` means the probe itself failed at the network level.
#[async_trait]
pub trait LinkProber: Send + Sync {
    async fn probe(&self, url: &str) -> Result<bool>;
}

/// HTTP prober issuing HEAD requests with bounded concurrency and one
/// immediate re-attempt on retriable failures.
pub struct HttpProber {
    client: Arc<reqwest::Client>,
    semaphore: Arc<Semaphore>,
    retries: u32,
}

impl HttpProber {
    pub fn new(client: Arc<reqwest::Client>, max_concurrency: usize, retries: u32) -> Self {
        Self {
            client,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            retries,
        }
    }

    async fn head(&self, url: &str) -> Result<bool> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .with_context(|| format!("Probe request failed for {url}"))?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl LinkProber for HttpProber {
    async fn probe(&self, url: &str) -> Result<bool> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .context("Probe semaphore closed")?;

        let mut last_err = None;
        for attempt in 0..=self.retries {
            match self.head(url).await {
                Ok(reachable) => return Ok(reachable),
                Err(e) => {
                    if attempt < self.retries && is_retriable_error(&e) {
                        debug!("Retrying probe for {url} after failure: {e:#}");
                        last_err = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("probe failed for {url}")))
    }
}

/// State threaded between crawl-detection batches.
///
/// Persisted by the caller between invocations; never held in process-wide
/// state. The URL caches avoid re-probing targets across batches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlState {
    /// Index of the first page the next batch should process.
    pub next_batch_start_index: usize,
    /// Targets already known unreachable.
    pub broken_urls_cache: HashSet<String>,
    /// Targets already known reachable.
    pub working_urls_cache: HashSet<String>,
    /// Broken-link candidates accumulated so far, deduplicated on
    /// `(url_from, url_to)`.
    pub partial_results: Vec<BrokenLinkCandidate>,
}

/// Per-batch probe accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub links_extracted: usize,
    pub probes_issued: usize,
    pub cache_hits: usize,
    pub broken_found: usize,
}

/// Result of one crawl-detection batch.
#[derive(Debug)]
pub struct CrawlBatchOutcome {
    /// Updated continuation state, including accumulated results.
    pub state: CrawlState,
    pub pages_processed: usize,
    pub pages_skipped: usize,
    /// Whether pages remain beyond this batch.
    pub has_more_pages: bool,
    pub stats: CrawlStats,
}

/// Extracts the internal anchor targets of one page.
///
/// Resolves relative and absolute `href`s against the page's final URL,
/// keeps only http(s) links on the same host, strips fragments, and
/// deduplicates while preserving document order. Parsing happens entirely
/// before any await point, since the parsed DOM is not `Send`.
pub fn extract_internal_links(page_url: &Url, html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("javascript:")
        {
            continue;
        }
        let Ok(mut resolved) = page_url.join(href) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        if resolved.host_str() != page_url.host_str() {
            continue;
        }
        resolved.set_fragment(None);
        let target = resolved.to_string();
        if seen.insert(target.clone()) {
            links.push(target);
        }
    }

    links
}

/// Processes at most `batch_size` pages starting at `start_index`.
///
/// For each page: parses the HTML, extracts internal anchor targets, and
/// probes each target's reachability — consulting the broken/working caches
/// first to avoid redundant network calls. A link is broken when the probe
/// yields a non-2xx status or a network error; crawl-detected links carry
/// `traffic_domain = 0` since the crawl has no traffic signal.
///
/// The function performs no scheduling of its own: it reports whether more
/// pages remain and lets the caller re-enter with the returned state.
pub async fn detect_from_crawl_batch(
    pages: &BTreeMap<String, String>,
    start_index: usize,
    batch_size: usize,
    mut state: CrawlState,
    prober: &dyn LinkProber,
    audit_stats: &AuditStats,
) -> CrawlBatchOutcome {
    let total_pages = pages.len();
    let start_index = start_index.min(total_pages);
    let end_index = (start_index + batch_size).min(total_pages);

    let mut stats = CrawlStats::default();
    let mut pages_processed = 0usize;
    let mut pages_skipped = 0usize;

    // url_to -> pages linking to it, across the whole batch
    let mut sources_by_target: HashMap<String, Vec<String>> = HashMap::new();

    for (page_url_str, html) in pages.iter().skip(start_index).take(end_index - start_index) {
        let parsed = Url::parse(page_url_str);
        let Ok(page_url) = parsed else {
            pages_skipped += 1;
            audit_stats.increment_info(InfoType::PageSkipped);
            debug!("Skipping page with unparseable URL: {page_url_str}");
            continue;
        };
        if html.trim().is_empty() {
            pages_skipped += 1;
            audit_stats.increment_info(InfoType::PageSkipped);
            debug!("Skipping page with empty body: {page_url_str}");
            continue;
        }

        pages_processed += 1;
        let links = extract_internal_links(&page_url, html);
        stats.links_extracted += links.len();
        for target in links {
            sources_by_target
                .entry(target)
                .or_default()
                .push(page_url_str.clone());
        }
    }

    let mut existing_keys: HashSet<String> =
        state.partial_results.iter().map(|link| link.key()).collect();
    let mut record_broken =
        |target: &str, sources: &[String], state: &mut CrawlState, stats: &mut CrawlStats| {
            for source in sources {
                let candidate = BrokenLinkCandidate::new(source.clone(), target.to_string(), 0);
                if existing_keys.insert(candidate.key()) {
                    stats.broken_found += 1;
                    audit_stats.increment_info(InfoType::BrokenLinkFound);
                    state.partial_results.push(candidate);
                }
            }
        };

    // Resolve cached targets first, then probe the rest concurrently.
    let mut unknown: Vec<(String, Vec<String>)> = Vec::new();
    let mut targets: Vec<(String, Vec<String>)> = sources_by_target.into_iter().collect();
    targets.sort_by(|a, b| a.0.cmp(&b.0));
    for (target, sources) in targets {
        if state.working_urls_cache.contains(&target) {
            stats.cache_hits += 1;
            audit_stats.increment_info(InfoType::ProbeCacheHit);
        } else if state.broken_urls_cache.contains(&target) {
            stats.cache_hits += 1;
            audit_stats.increment_info(InfoType::ProbeCacheHit);
            record_broken(&target, &sources, &mut state, &mut stats);
        } else {
            unknown.push((target, sources));
        }
    }

    stats.probes_issued = unknown.len();
    let probes = unknown.iter().map(|(target, _)| async move {
        let result = prober.probe(target).await;
        (target.clone(), result)
    });
    let probe_results: HashMap<String, Result<bool>> = join_all(probes).await.into_iter().collect();

    for (target, sources) in unknown {
        let broken = match probe_results.get(&target) {
            Some(Ok(reachable)) => !*reachable,
            Some(Err(e)) => {
                audit_stats.increment_error(ErrorType::ProbeNetworkError);
                debug!("Probe failed for {target}, treating as broken: {e:#}");
                true
            }
            // Unreachable: every probed target has an entry.
            None => true,
        };
        if broken {
            state.broken_urls_cache.insert(target.clone());
            record_broken(&target, &sources, &mut state, &mut stats);
        } else {
            state.working_urls_cache.insert(target);
        }
    }

    state.next_batch_start_index = end_index;
    let has_more_pages = end_index < total_pages;

    info!(
        "Crawl batch [{start_index}..{end_index}) of {total_pages} pages: {} processed, {} skipped, {} links, {} probes, {} cache hits, {} broken",
        pages_processed,
        pages_skipped,
        stats.links_extracted,
        stats.probes_issued,
        stats.cache_hits,
        stats.broken_found
    );

    CrawlBatchOutcome {
        state,
        pages_processed,
        pages_skipped,
        has_more_pages,
        stats,
    }
}
