// SQL for input ids and stored analyses.
//
// All statements live here as free functions over a borrowed Connection;
// the async Database trait in sqlite.rs forwards to them.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::StoredAnalysis;
use crate::report::CompositeResult;
use crate::scoring::risk::RiskLevel;

// --- Inputs ---

/// Add input ids, ignoring ones already present. Returns how many were new.
pub fn add_inputs(conn: &Connection, input_ids: &[String]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO inputs (input_id) VALUES (?1)")?;
        for id in input_ids {
            inserted += stmt.execute(params![id])?;
        }
    }
    tx.commit()?;
    Ok(inserted)
}

/// Number of stored input ids.
pub fn input_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM inputs", [], |row| row.get(0))?;
    Ok(count)
}

/// A random sample of stored input ids.
pub fn sample_inputs(conn: &Connection, limit: u32) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT input_id FROM inputs ORDER BY RANDOM() LIMIT ?1")?;
    let rows = stmt.query_map(params![limit], |row| row.get(0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

// --- Analyses ---

/// Save or replace the analysis for an input.
pub fn save_analysis(conn: &Connection, result: &CompositeResult) -> Result<()> {
    let json = serde_json::to_string(result)?;
    conn.execute(
        "INSERT INTO analyses (input_id, composite_score, risk_level, models_analyzed,
                               analysis_confidence, insufficient_data, result_json, analyzed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))
         ON CONFLICT(input_id) DO UPDATE SET
            composite_score = ?2,
            risk_level = ?3,
            models_analyzed = ?4,
            analysis_confidence = ?5,
            insufficient_data = ?6,
            result_json = ?7,
            analyzed_at = datetime('now')",
        params![
            result.input_id,
            result.composite_score,
            result.risk.risk_level.as_str(),
            result.summary.models_analyzed,
            result.summary.analysis_confidence.as_str(),
            result.summary.insufficient_data,
            json,
        ],
    )?;
    Ok(())
}

/// Load the stored analysis for one input.
pub fn get_analysis(conn: &Connection, input_id: &str) -> Result<Option<StoredAnalysis>> {
    let mut stmt = conn.prepare(
        "SELECT input_id, composite_score, models_analyzed, analysis_confidence,
                insufficient_data, result_json, analyzed_at
         FROM analyses
         WHERE input_id = ?1",
    )?;
    let result = stmt.query_row(params![input_id], row_to_analysis).optional()?;
    Ok(result)
}

/// Stored analyses at or above a minimum composite, highest first.
pub fn get_ranked_analyses(
    conn: &Connection,
    min_score: f64,
    limit: u32,
) -> Result<Vec<StoredAnalysis>> {
    let mut stmt = conn.prepare(
        "SELECT input_id, composite_score, models_analyzed, analysis_confidence,
                insufficient_data, result_json, analyzed_at
         FROM analyses
         WHERE composite_score >= ?1
         ORDER BY composite_score DESC, input_id ASC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![min_score, limit], row_to_analysis)?;

    let mut analyses = Vec::new();
    for row in rows {
        analyses.push(row?);
    }
    Ok(analyses)
}

/// Number of stored analyses.
pub fn analysis_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM analyses", [], |row| row.get(0))?;
    Ok(count)
}

/// Timestamp of the most recent analysis, if any.
pub fn last_analyzed_at(conn: &Connection) -> Result<Option<String>> {
    let result = conn.query_row("SELECT MAX(analyzed_at) FROM analyses", [], |row| row.get(0))?;
    Ok(result)
}

fn row_to_analysis(row: &Row<'_>) -> rusqlite::Result<StoredAnalysis> {
    let composite_score: f64 = row.get(1)?;
    // Level is derived from the stored score, not the stored label.
    let risk_level = RiskLevel::from_score(composite_score).to_string();
    Ok(StoredAnalysis {
        input_id: row.get(0)?,
        composite_score,
        risk_level,
        models_analyzed: row.get(2)?,
        analysis_confidence: row.get(3)?,
        insufficient_data: row.get(4)?,
        result_json: row.get(5)?,
        analyzed_at: row.get(6)?,
    })
}
