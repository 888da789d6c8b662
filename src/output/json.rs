// JSON export of a single analysis.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::report::CompositeResult;

/// `engagement_analysis_<input_id>_<YYYYmmdd_HHMMSS>.json`
pub fn default_filename(input_id: &str, now: DateTime<Utc>) -> String {
    format!(
        "engagement_analysis_{}_{}.json",
        input_id,
        now.format("%Y%m%d_%H%M%S")
    )
}

/// Write the pretty-printed report. With no path, a timestamped file in the
/// current directory is used. Returns the path written.
pub fn save_results(result: &CompositeResult, path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(default_filename(&result.input_id, Utc::now())),
    };

    let json = result
        .to_json_pretty()
        .context("Failed to serialize analysis")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_filename() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            default_filename("1233064764357726209", now),
            "engagement_analysis_1233064764357726209_20240309_140507.json"
        );
    }
}
