// Batch pipeline: analyze many inputs, one row per input.
//
// Inputs are analyzed one at a time (each analysis already fans out across
// the detectors). Nothing is dropped: an input id that isn't a numeric
// string, or whose analysis fails outright, becomes an ERROR row carrying
// the reason. When a database is given every successful analysis is saved;
// a save failure is logged and the row is kept.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::aggregate::Aggregator;
use crate::db::Database;
use crate::report::CompositeResult;
use crate::scoring::risk::RiskLevel;

/// Risk label written for inputs that could not be analyzed.
pub const ERROR_LABEL: &str = "ERROR";

/// One input's result in a batch run.
#[derive(Debug, Clone)]
pub enum BatchRow {
    Analyzed(Box<CompositeResult>),
    Failed {
        input_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl BatchRow {
    pub fn input_id(&self) -> &str {
        match self {
            BatchRow::Analyzed(result) => &result.input_id,
            BatchRow::Failed { input_id, .. } => input_id,
        }
    }

    pub fn risk_label(&self) -> &str {
        match self {
            BatchRow::Analyzed(result) => result.risk.risk_level.as_str(),
            BatchRow::Failed { .. } => ERROR_LABEL,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BatchRow::Failed { .. })
    }
}

/// Check an input id is a non-empty string of ASCII digits.
pub fn validate_input_id(input_id: &str) -> Result<()> {
    if input_id.is_empty() {
        anyhow::bail!("input id is empty");
    }
    if !input_id.chars().all(|c| c.is_ascii_digit()) {
        anyhow::bail!("input id '{input_id}' is not numeric");
    }
    Ok(())
}

/// Parse input ids from text: one per line, blank lines and `#` comments
/// ignored, surrounding whitespace trimmed.
pub fn parse_input_ids(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read input ids from a file (see `parse_input_ids`).
pub fn read_input_ids(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input ids from {}", path.display()))?;
    Ok(parse_input_ids(&text))
}

/// Run the batch. Returns one row per input id, in input order.
pub async fn run(
    aggregator: &Aggregator,
    db: Option<&Arc<dyn Database>>,
    input_ids: &[String],
    show_progress: bool,
) -> Result<Vec<BatchRow>> {
    let pb = if show_progress {
        let pb = ProgressBar::new(input_ids.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  Analyzing [{bar:30}] {pos}/{len} ({eta}) {msg}")?,
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut rows = Vec::with_capacity(input_ids.len());

    for input_id in input_ids {
        pb.set_message(input_id.clone());

        let row = match analyze_one(aggregator, input_id).await {
            Ok(result) => {
                if let Some(db) = db {
                    if let Err(e) = db.save_analysis(&result).await {
                        warn!(input_id, error = %e, "Failed to save analysis, keeping row");
                    }
                }
                BatchRow::Analyzed(Box::new(result))
            }
            Err(e) => {
                warn!(input_id, error = %e, "Analysis failed");
                BatchRow::Failed {
                    input_id: input_id.clone(),
                    reason: format!("{e:#}"),
                    timestamp: Utc::now(),
                }
            }
        };

        rows.push(row);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let failed = rows.iter().filter(|r| r.is_failed()).count();
    info!(
        total = rows.len(),
        failed,
        "Batch analysis complete"
    );

    Ok(rows)
}

async fn analyze_one(aggregator: &Aggregator, input_id: &str) -> Result<CompositeResult> {
    validate_input_id(input_id)?;
    aggregator.analyze(input_id).await
}

/// Aggregate statistics over a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Mean composite over all rows (ERROR rows count as 0.0).
    pub mean_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    /// Rows per risk label, highest level first, ERROR last. Zero counts
    /// are omitted.
    pub distribution: Vec<(String, usize)>,
}

/// Compute batch statistics. Returns `None` for an empty batch.
pub fn summarize(rows: &[BatchRow]) -> Option<BatchStats> {
    if rows.is_empty() {
        return None;
    }

    let scores: Vec<f64> = rows
        .iter()
        .map(|r| match r {
            BatchRow::Analyzed(result) => result.composite_score,
            BatchRow::Failed { .. } => 0.0,
        })
        .collect();

    let failed = rows.iter().filter(|r| r.is_failed()).count();

    let levels = [
        RiskLevel::Critical,
        RiskLevel::High,
        RiskLevel::Moderate,
        RiskLevel::Low,
        RiskLevel::Minimal,
    ];
    let mut distribution: Vec<(String, usize)> = levels
        .iter()
        .map(|level| {
            let count = rows
                .iter()
                .filter(|r| r.risk_label() == level.as_str())
                .count();
            (level.as_str().to_string(), count)
        })
        .collect();
    distribution.push((ERROR_LABEL.to_string(), failed));
    distribution.retain(|(_, count)| *count > 0);

    Some(BatchStats {
        total: rows.len(),
        succeeded: rows.len() - failed,
        failed,
        mean_score: scores.iter().sum::<f64>() / scores.len() as f64,
        min_score: scores.iter().copied().fold(f64::INFINITY, f64::min),
        max_score: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        distribution,
    })
}
