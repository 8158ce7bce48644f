//! Priority assignment for merged broken links.

use crate::config::constants::{PRIORITY_HIGH_THRESHOLD, PRIORITY_MEDIUM_THRESHOLD};
use crate::models::{BrokenLinkCandidate, PrioritizedLink, Priority};

/// Maps a traffic value onto a discrete priority.
///
/// Links with no traffic signal (crawl-detected, `traffic_domain == 0`) are
/// always `low`.
pub fn priority_for_traffic(traffic_domain: u64) -> Priority {
    if traffic_domain >= PRIORITY_HIGH_THRESHOLD {
        Priority::High
    } else if traffic_domain >= PRIORITY_MEDIUM_THRESHOLD {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Assigns a priority to every merged broken-link candidate.
///
/// Pure mapping, computed once during audit finalization; suggestion ids are
/// attached later by the synchronizer.
pub fn calculate_priority(links: Vec<BrokenLinkCandidate>) -> Vec<PrioritizedLink> {
    links
        .into_iter()
        .map(|link| PrioritizedLink {
            priority: priority_for_traffic(link.traffic_domain),
            url_from: link.url_from,
            url_to: link.url_to,
            traffic_domain: link.traffic_domain,
            suggestion_id: None,
        })
        .collect()
}
