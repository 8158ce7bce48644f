//! SQLite-backed suggestion store.
//!
//! Local binding of the suggestion-store capability: opportunities and
//! suggestions live in the audit database, with link data stored as a JSON
//! column. Record ids are row ids rendered as strings, since the trait keeps
//! ids opaque.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::error_handling::SuggestionStoreError;
use crate::models::{
    Opportunity, OpportunityStatus, PrioritizedLink, SuggestionRecord, SuggestionStatus,
};
use crate::sync::SuggestionStore;

pub struct SqliteSuggestionStore {
    pool: Arc<SqlitePool>,
}

impl SqliteSuggestionStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

fn parse_id(id: &str) -> Result<i64, SuggestionStoreError> {
    id.parse::<i64>()
        .map_err(|_| SuggestionStoreError::Backend(format!("malformed record id: {id}")))
}

fn parse_suggestion_status(raw: &str) -> Result<SuggestionStatus, SuggestionStoreError> {
    match raw {
        "NEW" => Ok(SuggestionStatus::New),
        "FIXED" => Ok(SuggestionStatus::Fixed),
        "OUTDATED" => Ok(SuggestionStatus::Outdated),
        other => Err(SuggestionStoreError::Backend(format!(
            "unknown suggestion status: {other}"
        ))),
    }
}

#[async_trait]
impl SuggestionStore for SqliteSuggestionStore {
    async fn find_opportunity(
        &self,
        site_id: &str,
        opportunity_type: &str,
    ) -> Result<Option<Opportunity>, SuggestionStoreError> {
        // Only open opportunities are reusable; a RESOLVED one stays closed
        // and a later regression gets a fresh record.
        let row = sqlx::query(
            "SELECT id, site_id, audit_id, status FROM opportunities
             WHERE site_id = ? AND opportunity_type = ? AND status = 'NEW'
             ORDER BY id DESC LIMIT 1",
        )
        .bind(site_id)
        .bind(opportunity_type)
        .fetch_optional(self.pool.as_ref())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Opportunity {
            id: row.get::<i64, _>("id").to_string(),
            site_id: row.get("site_id"),
            audit_id: row.get("audit_id"),
            status: OpportunityStatus::New,
        }))
    }

    async fn create_opportunity(
        &self,
        site_id: &str,
        audit_id: &str,
        opportunity_type: &str,
    ) -> Result<Opportunity, SuggestionStoreError> {
        let now = Utc::now().timestamp_millis();
        let result = sqlx::query(
            "INSERT INTO opportunities (site_id, audit_id, opportunity_type, status, created_at, updated_at)
             VALUES (?, ?, ?, 'NEW', ?, ?)",
        )
        .bind(site_id)
        .bind(audit_id)
        .bind(opportunity_type)
        .bind(now)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(Opportunity {
            id: result.last_insert_rowid().to_string(),
            site_id: site_id.to_string(),
            audit_id: audit_id.to_string(),
            status: OpportunityStatus::New,
        })
    }

    async fn suggestions_for_opportunity(
        &self,
        opportunity_id: &str,
    ) -> Result<Vec<SuggestionRecord>, SuggestionStoreError> {
        let opportunity_row_id = parse_id(opportunity_id)?;
        let rows = sqlx::query(
            "SELECT id, status, data FROM suggestions WHERE opportunity_id = ? ORDER BY id",
        )
        .bind(opportunity_row_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.get("data");
            let data: PrioritizedLink = serde_json::from_str(&raw).map_err(|e| {
                SuggestionStoreError::Backend(format!("corrupt suggestion data: {e}"))
            })?;
            records.push(SuggestionRecord {
                id: row.get::<i64, _>("id").to_string(),
                opportunity_id: opportunity_id.to_string(),
                status: parse_suggestion_status(row.get("status"))?,
                data,
            });
        }
        Ok(records)
    }

    async fn create_suggestion(
        &self,
        opportunity_id: &str,
        link: &PrioritizedLink,
    ) -> Result<String, SuggestionStoreError> {
        let opportunity_row_id = parse_id(opportunity_id)?;
        let data = serde_json::to_string(link).map_err(|e| {
            SuggestionStoreError::Backend(format!("unserializable suggestion data: {e}"))
        })?;
        let now = Utc::now().timestamp_millis();
        let result = sqlx::query(
            "INSERT INTO suggestions (opportunity_id, status, data, created_at, updated_at)
             VALUES (?, 'NEW', ?, ?, ?)",
        )
        .bind(opportunity_row_id)
        .bind(data)
        .bind(now)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.last_insert_rowid().to_string())
    }

    async fn update_suggestion(
        &self,
        suggestion_id: &str,
        link: &PrioritizedLink,
    ) -> Result<(), SuggestionStoreError> {
        let row_id = parse_id(suggestion_id)?;
        let data = serde_json::to_string(link).map_err(|e| {
            SuggestionStoreError::Backend(format!("unserializable suggestion data: {e}"))
        })?;
        let result = sqlx::query("UPDATE suggestions SET data = ?, updated_at = ? WHERE id = ?")
            .bind(data)
            .bind(Utc::now().timestamp_millis())
            .bind(row_id)
            .execute(self.pool.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(SuggestionStoreError::Backend(format!(
                "no suggestion with id {suggestion_id}"
            )));
        }
        Ok(())
    }

    async fn bulk_update_status(
        &self,
        suggestion_ids: &[String],
        status: SuggestionStatus,
    ) -> Result<(), SuggestionStoreError> {
        let now = Utc::now().timestamp_millis();
        for id in suggestion_ids {
            let row_id = parse_id(id)?;
            sqlx::query("UPDATE suggestions SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(now)
                .bind(row_id)
                .execute(self.pool.as_ref())
                .await?;
        }
        Ok(())
    }

    async fn update_opportunity_status(
        &self,
        opportunity_id: &str,
        status: OpportunityStatus,
    ) -> Result<(), SuggestionStoreError> {
        let row_id = parse_id(opportunity_id)?;
        let result =
            sqlx::query("UPDATE opportunities SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(Utc::now().timestamp_millis())
                .bind(row_id)
                .execute(self.pool.as_ref())
                .await?;
        if result.rows_affected() == 0 {
            return Err(SuggestionStoreError::OpportunityNotFound(
                opportunity_id.to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use crate::storage::run_migrations;

    async fn store() -> SqliteSuggestionStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteSuggestionStore::new(Arc::new(pool))
    }

    fn link(to: &str, traffic: u64) -> PrioritizedLink {
        PrioritizedLink {
            url_from: "https://a.com/page".to_string(),
            url_to: to.to_string(),
            traffic_domain: traffic,
            priority: Priority::Low,
            suggestion_id: None,
        }
    }

    #[tokio::test]
    async fn test_opportunity_lifecycle() {
        let store = store().await;
        assert!(store
            .find_opportunity("site-1", "broken-internal-links")
            .await
            .unwrap()
            .is_none());

        let opportunity = store
            .create_opportunity("site-1", "audit-1", "broken-internal-links")
            .await
            .unwrap();
        let found = store
            .find_opportunity("site-1", "broken-internal-links")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, opportunity.id);

        store
            .update_opportunity_status(&opportunity.id, OpportunityStatus::Resolved)
            .await
            .unwrap();
        // Resolved opportunities are not reused.
        assert!(store
            .find_opportunity("site-1", "broken-internal-links")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_suggestion_crud() {
        let store = store().await;
        let opportunity = store
            .create_opportunity("site-1", "audit-1", "broken-internal-links")
            .await
            .unwrap();

        let id = store
            .create_suggestion(&opportunity.id, &link("https://a.com/gone", 100))
            .await
            .unwrap();
        store
            .update_suggestion(&id, &link("https://a.com/gone", 1500))
            .await
            .unwrap();
        store
            .bulk_update_status(&[id.clone()], SuggestionStatus::Outdated)
            .await
            .unwrap();

        let records = store
            .suggestions_for_opportunity(&opportunity.id)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].status, SuggestionStatus::Outdated);
        assert_eq!(records[0].data.traffic_domain, 1500);
    }

    #[tokio::test]
    async fn test_update_missing_suggestion_is_error() {
        let store = store().await;
        let err = store
            .update_suggestion("999", &link("https://a.com/gone", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, SuggestionStoreError::Backend(_)));

        let err = store
            .update_opportunity_status("999", OpportunityStatus::Resolved)
            .await
            .unwrap_err();
        assert!(matches!(err, SuggestionStoreError::OpportunityNotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_id_is_backend_error() {
        let store = store().await;
        let err = store.suggestions_for_opportunity("not-a-number").await.unwrap_err();
        assert!(matches!(err, SuggestionStoreError::Backend(_)));
    }
}
