//! Merging RUM-detected and crawl-detected broken links.

use std::collections::HashSet;

use log::info;

use crate::models::BrokenLinkCandidate;

/// Combines the two detectors' candidates into a single deduplicated set.
///
/// RUM links are inserted first and keep their traffic values; a crawl link
/// colliding with a RUM link on the same `(url_from, url_to)` pair is
/// dropped (the crawl side has no traffic signal, so the RUM record always
/// wins). Duplicates within one source are dropped silently. The result
/// preserves insertion order: RUM links in input order, then crawl-only
/// links in input order, which makes the merge deterministic for a given
/// pair of inputs. The overlap count in the summary log counts keys present
/// in both sources, not occurrences.
pub fn merge_and_deduplicate(
    crawl_links: &[BrokenLinkCandidate],
    rum_links: &[BrokenLinkCandidate],
) -> Vec<BrokenLinkCandidate> {
    let mut merged: Vec<BrokenLinkCandidate> = Vec::with_capacity(crawl_links.len() + rum_links.len());
    let mut seen: HashSet<String> = HashSet::new();
    let mut rum_keys: HashSet<String> = HashSet::new();

    for link in rum_links {
        let key = link.key();
        if seen.insert(key.clone()) {
            rum_keys.insert(key);
            merged.push(link.clone());
        }
    }
    let rum_total = merged.len();

    let mut overlap = 0usize;
    for link in crawl_links {
        let key = link.key();
        if rum_keys.remove(&key) {
            // RUM traffic data wins; leave the existing record untouched.
            overlap += 1;
        } else if seen.insert(key) {
            merged.push(link.clone());
        }
    }

    let crawl_only = merged.len() - rum_total;
    let rum_only = rum_total - overlap;
    info!(
        "Merge results: {} total ({} crawl-only, {} RUM-only, {} overlap)",
        merged.len(),
        crawl_only,
        rum_only,
        overlap
    );

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(from: &str, to: &str, traffic: u64) -> BrokenLinkCandidate {
        BrokenLinkCandidate::new(from, to, traffic)
    }

    #[test]
    fn test_merge_rum_traffic_wins_on_overlap() {
        // Scenario: crawl=[{A,B,0}], rum=[{A,B,100},{C,D,50}]
        let crawl = vec![link("A", "B", 0)];
        let rum = vec![link("A", "B", 100), link("C", "D", 50)];
        let merged = merge_and_deduplicate(&crawl, &rum);
        assert_eq!(merged, vec![link("A", "B", 100), link("C", "D", 50)]);
    }

    #[test]
    fn test_merge_crawl_only_links_appended() {
        let crawl = vec![link("A", "B", 0), link("E", "F", 0)];
        let rum = vec![link("C", "D", 50)];
        let merged = merge_and_deduplicate(&crawl, &rum);
        assert_eq!(
            merged,
            vec![link("C", "D", 50), link("A", "B", 0), link("E", "F", 0)]
        );
    }

    #[test]
    fn test_merge_empty_inputs() {
        assert!(merge_and_deduplicate(&[], &[]).is_empty());
        let rum = vec![link("A", "B", 10)];
        assert_eq!(merge_and_deduplicate(&[], &rum), rum);
        let crawl = vec![link("A", "B", 0)];
        assert_eq!(merge_and_deduplicate(&crawl, &[]), crawl);
    }

    #[test]
    fn test_merge_deduplicates_within_one_source() {
        let rum = vec![link("A", "B", 100), link("A", "B", 200)];
        let merged = merge_and_deduplicate(&[], &rum);
        assert_eq!(merged, vec![link("A", "B", 100)]);
    }

    #[test]
    fn test_merge_duplicate_crawl_links_without_rum_match() {
        // Repeated crawl pairs with no RUM counterpart must collapse to one
        // record and never count toward the overlap accounting.
        let crawl = vec![link("E", "F", 0), link("E", "F", 0)];
        let merged = merge_and_deduplicate(&crawl, &[]);
        assert_eq!(merged, vec![link("E", "F", 0)]);
    }

    #[test]
    fn test_merge_duplicate_crawl_links_overlap_counted_per_key() {
        let crawl = vec![link("A", "B", 0), link("A", "B", 0), link("A", "B", 0)];
        let rum = vec![link("A", "B", 100)];
        let merged = merge_and_deduplicate(&crawl, &rum);
        assert_eq!(merged, vec![link("A", "B", 100)]);
    }

    #[test]
    fn test_merge_idempotent_for_same_inputs() {
        let crawl = vec![link("A", "B", 0), link("X", "Y", 0)];
        let rum = vec![link("A", "B", 300), link("C", "D", 50)];
        let first = merge_and_deduplicate(&crawl, &rum);
        let second = merge_and_deduplicate(&crawl, &rum);
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_reversed_pair_is_distinct() {
        // (A,B) and (B,A) are different identities.
        let crawl = vec![link("B", "A", 0)];
        let rum = vec![link("A", "B", 100)];
        let merged = merge_and_deduplicate(&crawl, &rum);
        assert_eq!(merged.len(), 2);
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    fn arb_links(max: usize) -> impl Strategy<Value = Vec<BrokenLinkCandidate>> {
        prop::collection::vec(
            ("[a-d]{1,3}", "[a-d]{1,3}", 0u64..5000).prop_map(|(from, to, traffic)| {
                BrokenLinkCandidate::new(from, to, traffic)
            }),
            0..max,
        )
    }

    proptest! {
        #[test]
        fn test_merge_size_bound(crawl in arb_links(20), rum in arb_links(20)) {
            let merged = merge_and_deduplicate(&crawl, &rum);
            prop_assert!(merged.len() <= crawl.len() + rum.len());
        }

        #[test]
        fn test_merge_no_duplicate_keys(crawl in arb_links(20), rum in arb_links(20)) {
            let merged = merge_and_deduplicate(&crawl, &rum);
            let mut keys: Vec<String> = merged.iter().map(|l| l.key()).collect();
            keys.sort();
            keys.dedup();
            prop_assert_eq!(keys.len(), merged.len());
        }

        #[test]
        fn test_merge_rum_precedence(crawl in arb_links(20), rum in arb_links(20)) {
            let merged = merge_and_deduplicate(&crawl, &rum);
            for link in &merged {
                if let Some(rum_match) = rum.iter().find(|r| r.key() == link.key()) {
                    prop_assert_eq!(link.traffic_domain, rum_match.traffic_domain);
                }
            }
        }
    }
}
