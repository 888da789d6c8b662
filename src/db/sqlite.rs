// SQLite implementation of the Database trait.
//
// rusqlite's Connection is !Sync, so it sits behind a tokio Mutex. Each
// method locks, runs one query function, and releases.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::StoredAnalysis;
use super::traits::Database;
use crate::report::CompositeResult;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn add_inputs(&self, input_ids: &[String]) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::add_inputs(&conn, input_ids)
    }

    async fn input_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::input_count(&conn)
    }

    async fn sample_inputs(&self, limit: u32) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        super::queries::sample_inputs(&conn, limit)
    }

    async fn save_analysis(&self, result: &CompositeResult) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::save_analysis(&conn, result)
    }

    async fn get_analysis(&self, input_id: &str) -> Result<Option<StoredAnalysis>> {
        let conn = self.conn.lock().await;
        super::queries::get_analysis(&conn, input_id)
    }

    async fn get_ranked_analyses(
        &self,
        min_score: f64,
        limit: u32,
    ) -> Result<Vec<StoredAnalysis>> {
        let conn = self.conn.lock().await;
        super::queries::get_ranked_analyses(&conn, min_score, limit)
    }

    async fn analysis_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::analysis_count(&conn)
    }

    async fn last_analyzed_at(&self) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::last_analyzed_at(&conn)
    }
}
