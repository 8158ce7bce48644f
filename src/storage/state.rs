//! Crawl continuation-state persistence.
//!
//! The crawl detector's [`CrawlState`] is serialized to JSON and stored per
//! site, so an interrupted run resumes from its last completed batch instead
//! of restarting.

use sqlx::{Row, SqlitePool};

use crate::detect::CrawlState;
use crate::error_handling::DatabaseError;

/// Loads the persisted crawl state for a site, if any.
pub async fn load_crawl_state(
    pool: &SqlitePool,
    site_id: &str,
) -> Result<Option<CrawlState>, DatabaseError> {
    let row = sqlx::query("SELECT state FROM crawl_state WHERE site_id = ?")
        .bind(site_id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::SqlError)?;

    let Some(row) = row else {
        return Ok(None);
    };
    let raw: String = row.get("state");
    let state = serde_json::from_str(&raw)
        .map_err(|e| DatabaseError::FileCreationError(format!("corrupt crawl state: {e}")))?;
    Ok(Some(state))
}

/// Saves the crawl state for a site, replacing any previous snapshot.
pub async fn save_crawl_state(
    pool: &SqlitePool,
    site_id: &str,
    state: &CrawlState,
) -> Result<(), DatabaseError> {
    let raw = serde_json::to_string(state)
        .map_err(|e| DatabaseError::FileCreationError(format!("unserializable crawl state: {e}")))?;
    sqlx::query(
        "INSERT INTO crawl_state (site_id, state, updated_at)
         VALUES (?, ?, ?)
         ON CONFLICT(site_id) DO UPDATE SET
             state=excluded.state,
             updated_at=excluded.updated_at",
    )
    .bind(site_id)
    .bind(raw)
    .bind(chrono::Utc::now().timestamp_millis())
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(())
}

/// Removes a site's crawl state once the crawl has fully completed.
pub async fn clear_crawl_state(pool: &SqlitePool, site_id: &str) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM crawl_state WHERE site_id = ?")
        .bind(site_id)
        .execute(pool)
        .await
        .map_err(DatabaseError::SqlError)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BrokenLinkCandidate;
    use crate::storage::run_migrations;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_state_round_trip() {
        let pool = pool().await;
        let mut state = CrawlState::default();
        state.next_batch_start_index = 60;
        state.broken_urls_cache.insert("https://a.com/gone".into());
        state
            .partial_results
            .push(BrokenLinkCandidate::new("https://a.com/x", "https://a.com/gone", 0));

        save_crawl_state(&pool, "site-1", &state).await.unwrap();
        let loaded = load_crawl_state(&pool, "site-1").await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_snapshot() {
        let pool = pool().await;
        let mut state = CrawlState::default();
        save_crawl_state(&pool, "site-1", &state).await.unwrap();
        state.next_batch_start_index = 30;
        save_crawl_state(&pool, "site-1", &state).await.unwrap();
        let loaded = load_crawl_state(&pool, "site-1").await.unwrap().unwrap();
        assert_eq!(loaded.next_batch_start_index, 30);
    }

    #[tokio::test]
    async fn test_missing_state_is_none_and_clear_is_idempotent() {
        let pool = pool().await;
        assert!(load_crawl_state(&pool, "site-1").await.unwrap().is_none());
        clear_crawl_state(&pool, "site-1").await.unwrap();

        save_crawl_state(&pool, "site-1", &CrawlState::default()).await.unwrap();
        clear_crawl_state(&pool, "site-1").await.unwrap();
        assert!(load_crawl_state(&pool, "site-1").await.unwrap().is_none());
    }
}
