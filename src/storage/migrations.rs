//! Schema management.
//!
//! The schema is small enough to apply inline at startup; every statement is
//! idempotent, so re-running against an existing database is a no-op.

use sqlx::{Pool, Sqlite};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS audit_runs (
        run_id TEXT PRIMARY KEY,
        site_id TEXT NOT NULL,
        audit_id TEXT NOT NULL,
        base_url TEXT NOT NULL,
        start_time INTEGER NOT NULL,
        end_time INTEGER,
        total_links INTEGER,
        crawl_links INTEGER,
        rum_links INTEGER,
        batches_sent INTEGER,
        success INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS crawl_state (
        site_id TEXT PRIMARY KEY,
        state TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS opportunities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id TEXT NOT NULL,
        audit_id TEXT NOT NULL,
        opportunity_type TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_opportunities_site
        ON opportunities (site_id, opportunity_type, status)",
    "CREATE TABLE IF NOT EXISTS suggestions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        opportunity_id INTEGER NOT NULL,
        status TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        FOREIGN KEY (opportunity_id) REFERENCES opportunities (id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_suggestions_opportunity
        ON suggestions (opportunity_id)",
];

/// Applies the schema to the database.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), anyhow::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
