//! RUM-based broken-link detection.
//!
//! Queries an analytics backend for the fixed "404 internal links" report
//! over a rolling time window and turns the raw rows into candidate records
//! with hosts normalized to the site's canonical domain.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{error, info};
use serde::Deserialize;
use url::Url;

use crate::config::constants::RUM_GRANULARITY;
use crate::error_handling::{AuditStats, ErrorType, WarningType};
use crate::models::BrokenLinkCandidate;

/// One raw row of the RUM 404 internal-links report.
#[derive(Debug, Clone, Deserialize)]
pub struct RumRow {
    pub url_from: String,
    pub url_to: String,
    #[serde(default)]
    pub traffic_domain: u64,
}

/// Analytics backend capability: the RUM query client is an external
/// collaborator, injected so tests can substitute fixed report data.
#[async_trait]
pub trait RumApiClient: Send + Sync {
    /// Queries the 404 internal-links report for `domain` over the last
    /// `window_days` days at the given granularity.
    async fn query_404_report(
        &self,
        domain: &str,
        window_days: u32,
        granularity: &str,
    ) -> Result<Vec<RumRow>>;
}

/// HTTP implementation of [`RumApiClient`] against a JSON report endpoint.
pub struct HttpRumClient {
    client: std::sync::Arc<reqwest::Client>,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct RumReportBody {
    #[serde(default)]
    results: Vec<RumRow>,
}

impl HttpRumClient {
    pub fn new(client: std::sync::Arc<reqwest::Client>, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RumApiClient for HttpRumClient {
    async fn query_404_report(
        &self,
        domain: &str,
        window_days: u32,
        granularity: &str,
    ) -> Result<Vec<RumRow>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("domain", domain),
                ("interval", &window_days.to_string()),
                ("granularity", granularity),
                ("checkpoint", "404"),
            ])
            .send()
            .await
            .context("RUM report request failed")?
            .error_for_status()
            .context("RUM report request returned an error status")?;
        let body: RumReportBody = response
            .json()
            .await
            .context("Failed to decode RUM report body")?;
        Ok(body.results)
    }
}

/// Outcome of RUM detection.
///
/// Query failures are reported as a structured `success: false` result
/// instead of an `Err`, so the encompassing audit step can record a
/// failed-audit result rather than crash the pipeline.
#[derive(Debug)]
pub struct RumDetection {
    pub success: bool,
    pub links: Vec<BrokenLinkCandidate>,
    pub error: Option<String>,
}

/// Rewrites a URL's host to the canonical domain.
///
/// Returns the original string unchanged when the URL does not parse or the
/// host cannot be set (RUM rows occasionally carry fragments that are not
/// valid URLs; those pass through untouched).
pub fn normalize_url_to_domain(url: &str, canonical_domain: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if parsed.set_host(Some(canonical_domain)).is_err() {
        return url.to_string();
    }
    parsed.to_string()
}

/// Queries the RUM backend for broken internal links.
///
/// Each raw row's `url_from`/`url_to`/`traffic_domain` becomes a
/// [`BrokenLinkCandidate`] with both URL hosts rewritten to the canonical
/// domain derived from the site's final URL.
pub async fn detect_from_rum(
    client: &dyn RumApiClient,
    domain: &str,
    canonical_domain: &str,
    window_days: u32,
    stats: &AuditStats,
) -> RumDetection {
    let rows = match client
        .query_404_report(domain, window_days, RUM_GRANULARITY)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            stats.increment_error(ErrorType::RumQueryError);
            error!("RUM 404 report query failed for {domain}: {e:#}");
            return RumDetection {
                success: false,
                links: Vec::new(),
                error: Some(format!("{e:#}")),
            };
        }
    };

    if rows.is_empty() {
        stats.increment_warning(WarningType::EmptyRumReport);
        info!("No 404 internal links found in RUM data for {domain}");
        return RumDetection {
            success: true,
            links: Vec::new(),
            error: None,
        };
    }

    let links = rows
        .into_iter()
        .map(|row| {
            BrokenLinkCandidate::new(
                normalize_url_to_domain(&row.url_from, canonical_domain),
                normalize_url_to_domain(&row.url_to, canonical_domain),
                row.traffic_domain,
            )
        })
        .collect::<Vec<_>>();

    info!("RUM detection found {} broken internal links", links.len());
    RumDetection {
        success: true,
        links,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct FixedRum {
        rows: Result<Vec<RumRow>, String>,
    }

    #[async_trait]
    impl RumApiClient for FixedRum {
        async fn query_404_report(&self, _: &str, _: u32, _: &str) -> Result<Vec<RumRow>> {
            match &self.rows {
                Ok(rows) => Ok(rows.clone()),
                Err(message) => Err(anyhow!("{message}")),
            }
        }
    }

    fn row(from: &str, to: &str, traffic: u64) -> RumRow {
        RumRow {
            url_from: from.to_string(),
            url_to: to.to_string(),
            traffic_domain: traffic,
        }
    }

    #[test]
    fn test_normalize_rewrites_host() {
        assert_eq!(
            normalize_url_to_domain("https://www.example.com/a", "example.com"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_normalize_unparseable_returns_input() {
        assert_eq!(normalize_url_to_domain("not a url", "example.com"), "not a url");
        assert_eq!(normalize_url_to_domain("", "example.com"), "");
    }

    #[tokio::test]
    async fn test_detect_renames_and_normalizes() {
        let client = FixedRum {
            rows: Ok(vec![row(
                "https://www.example.com/page",
                "https://www.example.com/gone",
                1800,
            )]),
        };
        let stats = AuditStats::new();
        let detection =
            detect_from_rum(&client, "example.com", "example.com", 30, &stats).await;
        assert!(detection.success);
        assert_eq!(detection.links.len(), 1);
        assert_eq!(detection.links[0].url_from, "https://example.com/page");
        assert_eq!(detection.links[0].url_to, "https://example.com/gone");
        assert_eq!(detection.links[0].traffic_domain, 1800);
    }

    #[tokio::test]
    async fn test_detect_empty_report() {
        let client = FixedRum { rows: Ok(vec![]) };
        let stats = AuditStats::new();
        let detection =
            detect_from_rum(&client, "example.com", "example.com", 30, &stats).await;
        assert!(detection.success);
        assert!(detection.links.is_empty());
        assert!(detection.error.is_none());
        assert_eq!(stats.get_warning_count(WarningType::EmptyRumReport), 1);
    }

    #[tokio::test]
    async fn test_detect_query_failure_is_structured() {
        let client = FixedRum {
            rows: Err("backend unavailable".to_string()),
        };
        let stats = AuditStats::new();
        let detection =
            detect_from_rum(&client, "example.com", "example.com", 30, &stats).await;
        assert!(!detection.success);
        assert!(detection.links.is_empty());
        assert!(detection.error.unwrap().contains("backend unavailable"));
        assert_eq!(stats.get_error_count(ErrorType::RumQueryError), 1);
    }
}
