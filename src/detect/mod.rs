//! Broken-link detection sources.
//!
//! Two independent detectors feed the audit: RUM analytics (real traffic
//! hitting 404s) and a crawl over the site's scraped pages.

pub mod crawl;
pub mod rum;

pub use crawl::{
    detect_from_crawl_batch, extract_internal_links, CrawlBatchOutcome, CrawlState, CrawlStats,
    HttpProber, LinkProber,
};
pub use rum::{
    detect_from_rum, normalize_url_to_domain, HttpRumClient, RumApiClient, RumDetection, RumRow,
};
