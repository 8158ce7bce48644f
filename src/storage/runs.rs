//! Audit-run metadata persistence.

use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;

/// Records the start of an audit run. Re-inserting the same run id refreshes
/// its metadata.
pub async fn insert_run_metadata(
    pool: &SqlitePool,
    run_id: &str,
    site_id: &str,
    audit_id: &str,
    base_url: &str,
    start_time: i64,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO audit_runs (run_id, site_id, audit_id, base_url, start_time)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(run_id) DO UPDATE SET
             site_id=excluded.site_id,
             audit_id=excluded.audit_id,
             base_url=excluded.base_url,
             start_time=excluded.start_time",
    )
    .bind(run_id)
    .bind(site_id)
    .bind(audit_id)
    .bind(base_url)
    .bind(start_time)
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(())
}

/// Updates run statistics when a run completes.
#[allow(clippy::too_many_arguments)]
pub async fn update_run_stats(
    pool: &SqlitePool,
    run_id: &str,
    total_links: usize,
    crawl_links: usize,
    rum_links: usize,
    batches_sent: usize,
    success: bool,
) -> Result<(), DatabaseError> {
    let end_time = chrono::Utc::now().timestamp_millis();

    sqlx::query(
        "UPDATE audit_runs
         SET end_time = ?, total_links = ?, crawl_links = ?, rum_links = ?,
             batches_sent = ?, success = ?
         WHERE run_id = ?",
    )
    .bind(end_time)
    .bind(total_links as i64)
    .bind(crawl_links as i64)
    .bind(rum_links as i64)
    .bind(batches_sent as i64)
    .bind(success as i64)
    .bind(run_id)
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::run_migrations;
    use sqlx::Row;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_run_metadata_round_trip() {
        let pool = pool().await;
        insert_run_metadata(&pool, "run-1", "site-1", "audit-1", "https://a.com", 1000)
            .await
            .unwrap();
        update_run_stats(&pool, "run-1", 12, 5, 8, 1, true).await.unwrap();

        let row = sqlx::query("SELECT total_links, success FROM audit_runs WHERE run_id = ?")
            .bind("run-1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.get::<i64, _>("total_links"), 12);
        assert_eq!(row.get::<i64, _>("success"), 1);
    }

    #[tokio::test]
    async fn test_reinsert_refreshes_metadata() {
        let pool = pool().await;
        insert_run_metadata(&pool, "run-1", "site-1", "audit-1", "https://a.com", 1000)
            .await
            .unwrap();
        insert_run_metadata(&pool, "run-1", "site-1", "audit-2", "https://a.com", 2000)
            .await
            .unwrap();
        let row = sqlx::query("SELECT audit_id, start_time FROM audit_runs WHERE run_id = ?")
            .bind("run-1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("audit_id"), "audit-2");
        assert_eq!(row.get::<i64, _>("start_time"), 2000);
    }
}
