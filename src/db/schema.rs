// Database schema: table creation.
//
// A `schema_version` table records which schema revision the file is at so
// later migrations can be applied in order.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// Idempotent: safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Post identifiers available for batch sampling
        CREATE TABLE IF NOT EXISTS inputs (
            input_id TEXT PRIMARY KEY,
            added_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Latest analysis per input
        CREATE TABLE IF NOT EXISTS analyses (
            input_id TEXT PRIMARY KEY,
            composite_score REAL NOT NULL,      -- 0.0 to 1.0
            risk_level TEXT NOT NULL,           -- MINIMAL / LOW / MODERATE / HIGH / CRITICAL
            models_analyzed TEXT NOT NULL,      -- 'k/n'
            analysis_confidence TEXT NOT NULL,  -- high / medium / low
            insufficient_data INTEGER NOT NULL DEFAULT 0,
            result_json TEXT NOT NULL,          -- full report
            analyzed_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Index for ranked reports
        CREATE INDEX IF NOT EXISTS idx_analyses_score
            ON analyses(composite_score);

        -- Index for finding the most recent analyses
        CREATE INDEX IF NOT EXISTS idx_analyses_age
            ON analyses(analyzed_at);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
