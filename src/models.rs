//! Typed records flowing through the audit pipeline.
//!
//! The detectors, merge step, synchronizer, and notifier all exchange these
//! shapes. Wire-facing structs serialize with camelCase field names to match
//! the queue-message and persisted-record contracts.

use serde::{Deserialize, Serialize};

use crate::config::constants::MYSTIQUE_MESSAGE_TYPE;

/// A broken internal link reported by one of the two detectors.
///
/// Identity is the ordered `(url_from, url_to)` pair; `traffic_domain` is
/// informational and only used for priority assignment and merge
/// tie-breaking. Records are immutable once emitted by a detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLinkCandidate {
    /// Page the broken link was found on.
    pub url_from: String,
    /// Target URL that does not resolve.
    pub url_to: String,
    /// Traffic attributed to the link by RUM data; 0 for crawl-detected links.
    pub traffic_domain: u64,
}

impl BrokenLinkCandidate {
    /// Creates a candidate record.
    pub fn new(url_from: impl Into<String>, url_to: impl Into<String>, traffic_domain: u64) -> Self {
        Self {
            url_from: url_from.into(),
            url_to: url_to.into(),
            traffic_domain,
        }
    }

    /// Deduplication key: the exact ordered URL pair.
    pub fn key(&self) -> String {
        format!("{}|{}", self.url_from, self.url_to)
    }
}

/// Discrete priority derived from a link's traffic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Traffic at or above the high threshold.
    High,
    /// Traffic at or above the medium threshold.
    Medium,
    /// Everything else, including links with no traffic signal.
    Low,
}

/// A broken link with its computed priority and, once synchronized, the id of
/// its persisted suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizedLink {
    pub url_from: String,
    pub url_to: String,
    pub traffic_domain: u64,
    pub priority: Priority,
    /// Set by the suggestion synchronizer; `None` until then.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion_id: Option<String>,
}

impl PrioritizedLink {
    /// Deduplication key: the exact ordered URL pair.
    pub fn key(&self) -> String {
        format!("{}|{}", self.url_from, self.url_to)
    }

    /// A link is sendable when both URLs are non-empty and a suggestion id
    /// has been attached by the synchronizer.
    pub fn is_sendable(&self) -> bool {
        !self.url_from.is_empty() && !self.url_to.is_empty() && self.suggestion_id.is_some()
    }
}

/// Lifecycle status of a persisted suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuggestionStatus {
    /// Actionable, unresolved finding.
    New,
    /// The broken link no longer appears and is considered repaired.
    Fixed,
    /// Superseded by a newer audit run.
    Outdated,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::New => "NEW",
            SuggestionStatus::Fixed => "FIXED",
            SuggestionStatus::Outdated => "OUTDATED",
        }
    }
}

/// Lifecycle status of a persisted opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpportunityStatus {
    /// Open, has unresolved suggestions.
    New,
    /// All of its broken links were resolved.
    Resolved,
}

impl OpportunityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::New => "NEW",
            OpportunityStatus::Resolved => "RESOLVED",
        }
    }
}

/// A site-scoped record grouping all currently-broken internal links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opportunity {
    pub id: String,
    pub site_id: String,
    pub audit_id: String,
    pub status: OpportunityStatus,
}

/// One persisted, opportunity-scoped finding: a single broken link with a
/// lifecycle status. Owned by the suggestion store; this crate only computes
/// diffs and issues create/update calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRecord {
    pub id: String,
    pub opportunity_id: String,
    pub status: SuggestionStatus,
    pub data: PrioritizedLink,
}

impl SuggestionRecord {
    /// Deduplication key of the underlying link.
    pub fn key(&self) -> String {
        self.data.key()
    }
}

/// Position of one batch within a notification cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfo {
    /// 1-based index of this batch.
    pub batch_index: usize,
    pub total_batches: usize,
    pub total_broken_links: usize,
}

/// Payload of one Mystique queue message.
///
/// Alternative URLs are carried once at the batch level, never per link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MystiquePayload {
    pub broken_links: Vec<PrioritizedLink>,
    pub alternative_urls: Vec<String>,
    /// Included so the consumer can normalize relative suggestions.
    #[serde(rename = "siteBaseURL")]
    pub site_base_url: String,
    pub batch_info: BatchInfo,
}

/// One queue message sent to the Mystique recommendation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MystiqueMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub site_id: String,
    pub audit_context: serde_json::Value,
    pub data: MystiquePayload,
}

impl MystiqueMessage {
    /// Builds a message for one batch of broken links.
    pub fn for_batch(
        site_id: &str,
        audit_id: &str,
        opportunity_id: &str,
        payload: MystiquePayload,
    ) -> Self {
        Self {
            message_type: MYSTIQUE_MESSAGE_TYPE.to_string(),
            site_id: site_id.to_string(),
            audit_context: serde_json::json!({
                "auditId": audit_id,
                "opportunityId": opportunity_id,
            }),
            data: payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_key_is_ordered_pair() {
        let a = BrokenLinkCandidate::new("https://a.com/x", "https://a.com/y", 10);
        let b = BrokenLinkCandidate::new("https://a.com/y", "https://a.com/x", 10);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), "https://a.com/x|https://a.com/y");
    }

    #[test]
    fn test_prioritized_link_sendable() {
        let mut link = PrioritizedLink {
            url_from: "https://a.com/x".into(),
            url_to: "https://a.com/y".into(),
            traffic_domain: 0,
            priority: Priority::Low,
            suggestion_id: None,
        };
        assert!(!link.is_sendable());
        link.suggestion_id = Some("sug-1".into());
        assert!(link.is_sendable());
        link.url_to.clear();
        assert!(!link.is_sendable());
    }

    #[test]
    fn test_candidate_serializes_camel_case() {
        let link = BrokenLinkCandidate::new("https://a.com/x", "https://a.com/y", 42);
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["urlFrom"], "https://a.com/x");
        assert_eq!(json["urlTo"], "https://a.com/y");
        assert_eq!(json["trafficDomain"], 42);
    }

    #[test]
    fn test_priority_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Priority::High).unwrap(), "high");
        assert_eq!(serde_json::to_value(Priority::Medium).unwrap(), "medium");
        assert_eq!(serde_json::to_value(Priority::Low).unwrap(), "low");
    }

    #[test]
    fn test_mystique_message_shape() {
        let payload = MystiquePayload {
            broken_links: vec![],
            alternative_urls: vec!["https://a.com/alt".into()],
            site_base_url: "https://a.com".into(),
            batch_info: BatchInfo {
                batch_index: 1,
                total_batches: 2,
                total_broken_links: 150,
            },
        };
        let msg = MystiqueMessage::for_batch("site-1", "audit-1", "opp-1", payload);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "guidance:broken-internal-links");
        assert_eq!(json["siteId"], "site-1");
        assert_eq!(json["auditContext"]["opportunityId"], "opp-1");
        assert_eq!(json["data"]["siteBaseURL"], "https://a.com");
        assert_eq!(json["data"]["batchInfo"]["batchIndex"], 1);
        assert_eq!(json["data"]["batchInfo"]["totalBrokenLinks"], 150);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(SuggestionStatus::New.as_str(), "NEW");
        assert_eq!(SuggestionStatus::Fixed.as_str(), "FIXED");
        assert_eq!(SuggestionStatus::Outdated.as_str(), "OUTDATED");
        assert_eq!(OpportunityStatus::Resolved.as_str(), "RESOLVED");
    }
}
