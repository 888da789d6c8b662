// CSV export of a batch run.
//
// One row per input. Fixed columns first, then one `<model>_score` column
// per registered model in registration order. A model that did not succeed
// gets 0.0; ERROR rows leave the model columns empty.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::pipeline::batch::{BatchRow, ERROR_LABEL};

const FIXED_COLUMNS: [&str; 7] = [
    "tweet_id",
    "composite_score",
    "risk_level",
    "risk_description",
    "models_analyzed",
    "analysis_confidence",
    "timestamp",
];

/// `batch_ecs_analysis_<YYYYmmdd_HHMMSS>.csv`
pub fn default_filename(now: DateTime<Utc>) -> String {
    format!("batch_ecs_analysis_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Render rows as CSV text, header included.
pub fn render(rows: &[BatchRow], model_ids: &[String]) -> String {
    let mut out = String::new();

    let header: Vec<String> = FIXED_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(model_ids.iter().map(|id| format!("{id}_score")))
        .collect();
    push_record(&mut out, &header);

    for row in rows {
        push_record(&mut out, &row_fields(row, model_ids));
    }
    out
}

/// Write rows to `path`.
pub fn write(rows: &[BatchRow], model_ids: &[String], path: &Path) -> Result<()> {
    std::fs::write(path, render(rows, model_ids))
        .with_context(|| format!("Failed to write CSV to {}", path.display()))
}

fn row_fields(row: &BatchRow, model_ids: &[String]) -> Vec<String> {
    match row {
        BatchRow::Analyzed(result) => {
            let mut fields = vec![
                result.input_id.clone(),
                format_score(result.composite_score),
                result.risk.risk_level.as_str().to_string(),
                result.risk.risk_description.clone(),
                result.summary.models_analyzed.clone(),
                result.summary.analysis_confidence.as_str().to_string(),
                format_timestamp(result.timestamp),
            ];
            fields.extend(model_ids.iter().map(|id| {
                let score = result
                    .outcome(id)
                    .and_then(|o| o.valid_score())
                    .unwrap_or(0.0);
                format_score(score)
            }));
            fields
        }
        BatchRow::Failed {
            input_id,
            reason,
            timestamp,
        } => {
            let mut fields = vec![
                input_id.clone(),
                format_score(0.0),
                ERROR_LABEL.to_string(),
                format!("Analysis failed: {reason}"),
                "0".to_string(),
                ERROR_LABEL.to_string(),
                format_timestamp(*timestamp),
            ];
            fields.extend(model_ids.iter().map(|_| String::new()));
            fields
        }
    }
}

fn format_score(score: f64) -> String {
    // Debug keeps the trailing ".0" on whole numbers.
    format!("{score:?}")
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn push_record(out: &mut String, fields: &[String]) {
    let escaped: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    out.push_str(&escaped.join(","));
    out.push('\n');
}

/// Quote a field if it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_format_score_keeps_decimal() {
        assert_eq!(format_score(0.0), "0.0");
        assert_eq!(format_score(0.42), "0.42");
        assert_eq!(format_score(1.0), "1.0");
    }

    #[test]
    fn test_header_only_for_empty_batch() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            render(&[], &ids),
            "tweet_id,composite_score,risk_level,risk_description,models_analyzed,\
             analysis_confidence,timestamp,a_score,b_score\n"
        );
    }
}
