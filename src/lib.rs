//! link_audit library: broken internal-link detection and reporting.
//!
//! This library audits a website for broken internal links by combining two
//! detection sources — RUM analytics (real traffic hitting 404s) and a crawl
//! over the site's scraped pages — then merges and prioritizes the findings,
//! synchronizes them into a persisted opportunity/suggestion store, and
//! notifies the Mystique recommendation service in bounded batches.
//!
//! # Example
//!
//! ```no_run
//! use link_audit::{run_audit, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     base_url: "https://example.com".to_string(),
//!     site_id: "site-1".to_string(),
//!     ..Default::default()
//! };
//!
//! let report = run_audit(config).await?;
//! println!(
//!     "Found {} broken links ({} from crawl, {} from RUM)",
//!     report.total_links, report.crawl_links, report.rum_links
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

pub mod config;
pub mod detect;
pub mod error_handling;
pub mod initialization;
pub mod locale;
pub mod merge;
pub mod models;
pub mod notify;
pub mod pages;
pub mod priority;
pub mod scope;
pub mod storage;
pub mod sync;
mod utils;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel};
pub use detect::{CrawlState, LinkProber, RumApiClient};
pub use error_handling::{AuditStats, QueueError, SuggestionStoreError};
pub use notify::QueueSender;
pub use pages::PageStore;
pub use run::{run_audit, run_audit_with, AuditCollaborators, AuditInputs, AuditReport};
pub use sync::SuggestionStore;

// Internal run module (contains the audit orchestration)
mod run {
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Instant;

    use anyhow::{Context, Result};
    use chrono::Utc;
    use log::{info, warn};
    use url::Url;

    use crate::config::constants::{CRAWL_BATCH_SIZE, OPPORTUNITY_TYPE, RUM_GRANULARITY};
    use crate::config::Config;
    use crate::detect::{
        detect_from_crawl_batch, detect_from_rum, HttpProber, HttpRumClient, LinkProber,
        RumApiClient,
    };
    use crate::error_handling::{print_audit_statistics, AuditStats, ErrorType};
    use crate::initialization::init_client;
    use crate::merge::merge_and_deduplicate;
    use crate::models::BrokenLinkCandidate;
    use crate::notify::{notify_mystique, FileQueueSender, LoggingQueueSender, QueueSender};
    use crate::pages::{fetch_pages, FsPageStore, PageStore};
    use crate::priority::calculate_priority;
    use crate::scope::{filter_by_scope, prepare_scrape_targets};
    use crate::storage::{
        clear_crawl_state, init_db_pool_with_path, insert_run_metadata, load_crawl_state,
        run_migrations, save_crawl_state, update_run_stats, SqliteSuggestionStore,
    };
    use crate::sync::{sync_suggestions, SuggestionStore};

    /// Results of one audit run.
    #[derive(Debug, Clone)]
    pub struct AuditReport {
        /// Run identifier (format: `run_<timestamp_millis>`)
        pub run_id: String,
        /// Site identifier the audit ran against
        pub site_id: String,
        /// Broken links after merge, scope filtering, and deduplication
        pub total_links: usize,
        /// Broken links contributed by the crawl detector (pre-merge)
        pub crawl_links: usize,
        /// Broken links contributed by RUM detection (pre-merge)
        pub rum_links: usize,
        /// Number of Mystique batches dispatched
        pub batches_sent: usize,
        /// Whether the opportunity was resolved because nothing is broken
        pub resolved_opportunity: bool,
        /// Whether detection completed without a backend failure
        pub success: bool,
        /// RUM query failure message, when `success` is false
        pub rum_error: Option<String>,
        /// Path to the SQLite database holding run metadata and suggestions
        pub db_path: PathBuf,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// External collaborators of the audit pipeline.
    ///
    /// Every boundary the audit crosses — analytics, page storage, link
    /// probing, suggestion persistence, the outbound queue — is a trait
    /// object here, so tests and embedders can substitute their own.
    pub struct AuditCollaborators {
        /// RUM analytics client; `None` skips RUM detection entirely.
        pub rum: Option<Arc<dyn RumApiClient>>,
        pub prober: Arc<dyn LinkProber>,
        pub pages: Arc<dyn PageStore>,
        pub store: Arc<dyn SuggestionStore>,
        pub queue: Arc<dyn QueueSender>,
    }

    /// Pre-loaded audit inputs: the scrape manifest and the site's top pages.
    #[derive(Debug, Default)]
    pub struct AuditInputs {
        /// Page URL -> object key of its scraped body.
        pub manifest: BTreeMap<String, String>,
        /// Top pages by traffic, used for alternative-URL suggestions.
        pub top_pages: Vec<String>,
    }

    fn host_of(base_url: &str) -> Result<String> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("Invalid base URL: {base_url}"))?;
        parsed
            .host_str()
            .map(|h| h.to_string())
            .with_context(|| format!("Base URL has no host: {base_url}"))
    }

    async fn read_top_pages(path: &PathBuf) -> Result<Vec<String>> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read top pages file {}", path.display()))?;
        serde_json::from_str(&raw).context("Failed to parse top pages file")
    }

    /// Runs a full audit with the default collaborators.
    ///
    /// Builds the HTTP prober, filesystem page store, SQLite suggestion
    /// store, and outbox queue sender from the configuration, then delegates
    /// to [`run_audit_with`]. With `--dry-run`, queue messages are logged
    /// instead of written.
    pub async fn run_audit(config: Config) -> Result<AuditReport> {
        let client = init_client(&config).context("Failed to initialize HTTP client")?;

        let page_store = FsPageStore::new(config.scrape_dir.clone());
        let manifest = match page_store.load_manifest().await {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("No scrape manifest available, skipping crawl detection: {e:#}");
                BTreeMap::new()
            }
        };
        let top_pages = match &config.top_pages_file {
            Some(path) => read_top_pages(path).await?,
            None => Vec::new(),
        };

        let pool = init_db_pool_with_path(&config.db_path)
            .await
            .context("Failed to open audit database")?;
        run_migrations(&pool).await.context("Failed to apply schema")?;

        let rum: Option<Arc<dyn RumApiClient>> = config
            .rum_endpoint
            .as_ref()
            .map(|endpoint| {
                Arc::new(HttpRumClient::new(client.clone(), endpoint.clone()))
                    as Arc<dyn RumApiClient>
            });
        let queue: Arc<dyn QueueSender> = if config.dry_run {
            Arc::new(LoggingQueueSender)
        } else {
            Arc::new(FileQueueSender::new(config.mystique_outbox.clone()))
        };

        let collaborators = AuditCollaborators {
            rum,
            prober: Arc::new(HttpProber::new(client, config.max_concurrency, 1)),
            pages: Arc::new(page_store),
            store: Arc::new(SqliteSuggestionStore::new(pool)),
            queue,
        };

        run_audit_with(config, collaborators, AuditInputs { manifest, top_pages }).await
    }

    /// Runs a full audit against explicit collaborators and inputs.
    ///
    /// The pipeline: scope the top pages, fetch scraped bodies, run the
    /// resumable crawl detector batch by batch (persisting continuation
    /// state), query RUM, scope-filter and merge both link sets, assign
    /// priorities, synchronize suggestions, and notify Mystique.
    ///
    /// A RUM backend failure does not abort the run: it is recorded as a
    /// completed audit with `success: false` so the failure is visible
    /// without losing the crawl's work.
    pub async fn run_audit_with(
        config: Config,
        collaborators: AuditCollaborators,
        inputs: AuditInputs,
    ) -> Result<AuditReport> {
        let start = Instant::now();
        let stats = AuditStats::new();

        let domain = host_of(&config.base_url)?;
        let site_id = if config.site_id.is_empty() {
            domain.clone()
        } else {
            config.site_id.clone()
        };
        let audit_id = if config.audit_id.is_empty() {
            format!("audit_{}", Utc::now().timestamp_millis())
        } else {
            config.audit_id.clone()
        };
        let run_id = format!("run_{}", Utc::now().timestamp_millis());

        let pool = init_db_pool_with_path(&config.db_path)
            .await
            .context("Failed to open audit database")?;
        run_migrations(&pool).await.context("Failed to apply schema")?;
        insert_run_metadata(
            &pool,
            &run_id,
            &site_id,
            &audit_id,
            &config.base_url,
            Utc::now().timestamp_millis(),
        )
        .await
        .context("Failed to record run metadata")?;

        // Scoping the top pages up front surfaces a misconfigured base URL
        // before any network work happens.
        let top_pages = prepare_scrape_targets(&config.base_url, &inputs.top_pages)?;

        // Crawl detection, resumable batch by batch.
        let crawl_links = if inputs.manifest.is_empty() {
            info!("No scraped pages available, skipping crawl detection");
            Vec::new()
        } else {
            let pages = fetch_pages(collaborators.pages.as_ref(), &inputs.manifest, &stats).await?;
            let mut state = load_crawl_state(&pool, &site_id)
                .await
                .context("Failed to load crawl state")?
                .unwrap_or_default();
            if state.next_batch_start_index > 0 {
                info!(
                    "Resuming crawl detection at page index {}",
                    state.next_batch_start_index
                );
            }
            loop {
                let outcome = detect_from_crawl_batch(
                    &pages,
                    state.next_batch_start_index,
                    CRAWL_BATCH_SIZE,
                    state,
                    collaborators.prober.as_ref(),
                    &stats,
                )
                .await;
                state = outcome.state;
                save_crawl_state(&pool, &site_id, &state)
                    .await
                    .context("Failed to save crawl state")?;
                if !outcome.has_more_pages {
                    break;
                }
            }
            clear_crawl_state(&pool, &site_id)
                .await
                .context("Failed to clear crawl state")?;
            state.partial_results
        };

        // RUM detection.
        let rum_detection = match &collaborators.rum {
            Some(rum) => Some(
                detect_from_rum(
                    rum.as_ref(),
                    &domain,
                    &domain,
                    config.rum_window_days,
                    &stats,
                )
                .await,
            ),
            None => {
                info!("No RUM client configured, skipping RUM detection");
                None
            }
        };

        if let Some(detection) = &rum_detection {
            if !detection.success {
                update_run_stats(&pool, &run_id, 0, crawl_links.len(), 0, 0, false)
                    .await
                    .context("Failed to record run stats")?;
                print_audit_statistics(&stats);
                return Ok(AuditReport {
                    run_id,
                    site_id,
                    total_links: 0,
                    crawl_links: crawl_links.len(),
                    rum_links: 0,
                    batches_sent: 0,
                    resolved_opportunity: false,
                    success: false,
                    rum_error: detection.error.clone(),
                    db_path: config.db_path.clone(),
                    elapsed_seconds: start.elapsed().as_secs_f64(),
                });
            }
        }
        let rum_links: Vec<BrokenLinkCandidate> = rum_detection
            .map(|detection| detection.links)
            .unwrap_or_default();

        let crawl_count = crawl_links.len();
        let rum_count = rum_links.len();
        let merged = merge_and_deduplicate(&crawl_links, &rum_links);
        let scoped = filter_by_scope(&config.base_url, merged);
        let prioritized = calculate_priority(scoped);

        let sync_outcome = match sync_suggestions(
            collaborators.store.as_ref(),
            &site_id,
            &audit_id,
            OPPORTUNITY_TYPE,
            prioritized,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                stats.increment_error(ErrorType::SuggestionStoreError);
                print_audit_statistics(&stats);
                return Err(e);
            }
        };

        let batches_sent = notify_mystique(
            collaborators.queue.as_ref(),
            sync_outcome.opportunity_id.as_deref(),
            &site_id,
            &audit_id,
            &sync_outcome.links,
            &top_pages,
            &config.base_url,
            &stats,
        )
        .await?;

        update_run_stats(
            &pool,
            &run_id,
            sync_outcome.links.len(),
            crawl_count,
            rum_count,
            batches_sent,
            true,
        )
        .await
        .context("Failed to record run stats")?;
        print_audit_statistics(&stats);

        info!(
            "Audit {run_id} complete: {} broken links ({} crawl, {} rum), {} batch(es) sent ({} days RUM window, {} granularity)",
            sync_outcome.links.len(),
            crawl_count,
            rum_count,
            batches_sent,
            config.rum_window_days,
            RUM_GRANULARITY
        );

        Ok(AuditReport {
            run_id,
            site_id,
            total_links: sync_outcome.links.len(),
            crawl_links: crawl_count,
            rum_links: rum_count,
            batches_sent,
            resolved_opportunity: sync_outcome.resolved_opportunity,
            success: true,
            rum_error: None,
            db_path: config.db_path.clone(),
            elapsed_seconds: start.elapsed().as_secs_f64(),
        })
    }
}
