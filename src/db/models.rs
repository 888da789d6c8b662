// Data models: Rust structs that map to database rows.
//
// Kept separate from the queries so other modules can use them without
// depending on rusqlite directly.

use serde::{Deserialize, Serialize};

/// A stored analysis, as listed in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub input_id: String,
    pub composite_score: f64,
    /// Recomputed from `composite_score` on read.
    pub risk_level: String,
    /// "k/n" successful over registered models.
    pub models_analyzed: String,
    pub analysis_confidence: String,
    pub insufficient_data: bool,
    /// The full serialized CompositeResult.
    pub result_json: String,
    pub analyzed_at: String,
}
