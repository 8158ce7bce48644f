//! Suggestion synchronization.
//!
//! Reconciles the current audit's prioritized broken links against the
//! persisted opportunity and its suggestions: creates suggestions for new
//! links, updates changed ones, marks absent NEW suggestions OUTDATED, and
//! resolves the whole opportunity when the audit found nothing.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;

use crate::error_handling::SuggestionStoreError;
use crate::models::{
    Opportunity, OpportunityStatus, PrioritizedLink, SuggestionRecord, SuggestionStatus,
};

/// Persistence capability for opportunities and their suggestions.
///
/// The store owns record identity and timestamps; this crate only computes
/// diffs and issues mutations.
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    /// Finds the site's opportunity for the given opportunity type, if any.
    async fn find_opportunity(
        &self,
        site_id: &str,
        opportunity_type: &str,
    ) -> Result<Option<Opportunity>, SuggestionStoreError>;

    /// Creates a fresh opportunity in NEW status and returns it.
    async fn create_opportunity(
        &self,
        site_id: &str,
        audit_id: &str,
        opportunity_type: &str,
    ) -> Result<Opportunity, SuggestionStoreError>;

    /// Returns all suggestions attached to an opportunity.
    async fn suggestions_for_opportunity(
        &self,
        opportunity_id: &str,
    ) -> Result<Vec<SuggestionRecord>, SuggestionStoreError>;

    /// Creates a suggestion in NEW status and returns its id.
    async fn create_suggestion(
        &self,
        opportunity_id: &str,
        link: &PrioritizedLink,
    ) -> Result<String, SuggestionStoreError>;

    /// Overwrites a suggestion's link data.
    async fn update_suggestion(
        &self,
        suggestion_id: &str,
        link: &PrioritizedLink,
    ) -> Result<(), SuggestionStoreError>;

    /// Sets the status of each named suggestion.
    async fn bulk_update_status(
        &self,
        suggestion_ids: &[String],
        status: SuggestionStatus,
    ) -> Result<(), SuggestionStoreError>;

    /// Sets an opportunity's status.
    async fn update_opportunity_status(
        &self,
        opportunity_id: &str,
        status: OpportunityStatus,
    ) -> Result<(), SuggestionStoreError>;
}

/// Result of one synchronization pass.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// Id of the opportunity the suggestions live under; `None` only when the
    /// audit found nothing and no opportunity existed to resolve.
    pub opportunity_id: Option<String>,
    /// The input links with suggestion ids attached.
    pub links: Vec<PrioritizedLink>,
    pub created: usize,
    pub updated: usize,
    pub outdated: usize,
    /// Whether the opportunity was transitioned to RESOLVED.
    pub resolved_opportunity: bool,
}

/// Reconciles `links` with the persisted suggestion set for the site.
///
/// With an empty `links` set: an existing opportunity is RESOLVED and its
/// NEW suggestions marked FIXED; when no opportunity exists, nothing is
/// created. With a nonempty set: the opportunity is created on demand,
/// missing suggestions are created, suggestions whose traffic or priority
/// changed are updated in place, and NEW suggestions absent from this audit
/// are bulk-marked OUTDATED. Non-NEW suggestions are never touched by the
/// outdating pass.
pub async fn sync_suggestions(
    store: &dyn SuggestionStore,
    site_id: &str,
    audit_id: &str,
    opportunity_type: &str,
    links: Vec<PrioritizedLink>,
) -> Result<SyncOutcome> {
    let existing_opportunity = store
        .find_opportunity(site_id, opportunity_type)
        .await
        .context("Error updating suggestions")?;

    if links.is_empty() {
        let Some(opportunity) = existing_opportunity else {
            info!("No broken links and no existing opportunity for site {site_id}; nothing to sync");
            return Ok(SyncOutcome::default());
        };

        let suggestions = store
            .suggestions_for_opportunity(&opportunity.id)
            .await
            .context("Error updating suggestions")?;
        let open_ids: Vec<String> = suggestions
            .iter()
            .filter(|s| s.status == SuggestionStatus::New)
            .map(|s| s.id.clone())
            .collect();
        if !open_ids.is_empty() {
            store
                .bulk_update_status(&open_ids, SuggestionStatus::Fixed)
                .await
                .context("Error updating suggestions")?;
        }
        store
            .update_opportunity_status(&opportunity.id, OpportunityStatus::Resolved)
            .await
            .context("Error updating suggestions")?;
        info!(
            "All broken links resolved for site {site_id}: opportunity {} RESOLVED, {} suggestions FIXED",
            opportunity.id,
            open_ids.len()
        );
        return Ok(SyncOutcome {
            opportunity_id: Some(opportunity.id),
            links,
            outdated: 0,
            resolved_opportunity: true,
            ..SyncOutcome::default()
        });
    }

    let opportunity = match existing_opportunity {
        Some(opportunity) => opportunity,
        None => store
            .create_opportunity(site_id, audit_id, opportunity_type)
            .await
            .context("Error updating suggestions")?,
    };

    let existing = store
        .suggestions_for_opportunity(&opportunity.id)
        .await
        .context("Error updating suggestions")?;
    let existing_by_key: HashMap<String, &SuggestionRecord> =
        existing.iter().map(|s| (s.key(), s)).collect();

    let mut outcome = SyncOutcome {
        opportunity_id: Some(opportunity.id.clone()),
        ..SyncOutcome::default()
    };

    let mut synced = Vec::with_capacity(links.len());
    for mut link in links {
        match existing_by_key.get(&link.key()) {
            Some(record) => {
                let changed = record.data.traffic_domain != link.traffic_domain
                    || record.data.priority != link.priority;
                if changed {
                    let mut updated = link.clone();
                    updated.suggestion_id = Some(record.id.clone());
                    store
                        .update_suggestion(&record.id, &updated)
                        .await
                        .context("Error updating suggestions")?;
                    outcome.updated += 1;
                }
                link.suggestion_id = Some(record.id.clone());
            }
            None => {
                let id = store
                    .create_suggestion(&opportunity.id, &link)
                    .await
                    .context("Error updating suggestions")?;
                link.suggestion_id = Some(id);
                outcome.created += 1;
            }
        }
        synced.push(link);
    }

    let current_keys: HashSet<String> = synced.iter().map(|l| l.key()).collect();
    let stale_ids: Vec<String> = existing
        .iter()
        .filter(|s| s.status == SuggestionStatus::New && !current_keys.contains(&s.key()))
        .map(|s| s.id.clone())
        .collect();
    if !stale_ids.is_empty() {
        store
            .bulk_update_status(&stale_ids, SuggestionStatus::Outdated)
            .await
            .context("Error updating suggestions")?;
        outcome.outdated = stale_ids.len();
    }

    info!(
        "Suggestion sync for site {site_id}: {} created, {} updated, {} outdated under opportunity {}",
        outcome.created, outcome.updated, outcome.outdated, opportunity.id
    );

    outcome.links = synced;
    Ok(outcome)
}
