// Database trait: backend-agnostic async interface for all DB operations.
//
// The SQLite backend wraps a synchronous rusqlite Connection behind a
// tokio Mutex; keeping the trait async lets callers share one
// `Arc<dyn Database>` across tasks without caring which backend is behind it.

use anyhow::Result;
use async_trait::async_trait;

use super::models::StoredAnalysis;
use crate::report::CompositeResult;

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Inputs ---

    /// Add input ids (duplicates ignored). Returns how many were new.
    async fn add_inputs(&self, input_ids: &[String]) -> Result<usize>;

    /// Number of stored input ids.
    async fn input_count(&self) -> Result<i64>;

    /// A random sample of stored input ids.
    async fn sample_inputs(&self, limit: u32) -> Result<Vec<String>>;

    // --- Analyses ---

    /// Save or replace the analysis for an input.
    async fn save_analysis(&self, result: &CompositeResult) -> Result<()>;

    /// Load the stored analysis for one input.
    async fn get_analysis(&self, input_id: &str) -> Result<Option<StoredAnalysis>>;

    /// Stored analyses at or above `min_score`, highest composite first.
    async fn get_ranked_analyses(&self, min_score: f64, limit: u32)
        -> Result<Vec<StoredAnalysis>>;

    /// Number of stored analyses.
    async fn analysis_count(&self) -> Result<i64>;

    /// Timestamp of the most recent analysis.
    async fn last_analyzed_at(&self) -> Result<Option<String>>;
}
