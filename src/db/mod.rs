// Database layer: SQLite storage for input ids and analysis history.
//
// rusqlite is built with "bundled", so no system SQLite is needed. The file
// location comes from CONCORDANCE_DB_PATH (default ./concordance.db).

pub mod models;
pub mod queries;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use traits::Database;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

/// Create the database file if needed and make sure every table exists.
///
/// Used by `concordance init` and by every command that stores results.
pub fn initialize(db_path: &str) -> Result<Connection> {
    let parent = Path::new(db_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create database directory {}", dir.display()))?;
    }

    let conn = connect(db_path)?;
    schema::create_tables(&conn)?;
    Ok(conn)
}

/// Open a database created earlier by `initialize`.
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!("No database at {}. Run `concordance init` first.", db_path);
    }
    connect(db_path)
}

fn connect(db_path: &str) -> Result<Connection> {
    let conn =
        Connection::open(db_path).with_context(|| format!("Cannot open database {}", db_path))?;
    // WAL lets `report` and `status` read while a batch is writing.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(conn)
}

/// `initialize`, wrapped as a shared `Database`.
pub fn initialize_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    Ok(Arc::new(sqlite::SqliteDatabase::new(initialize(db_path)?)))
}

/// `open`, wrapped as a shared `Database`.
pub fn open_sqlite(db_path: &str) -> Result<Arc<dyn Database>> {
    Ok(Arc::new(sqlite::SqliteDatabase::new(open(db_path)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        assert!(open(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_initialize_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/concordance.db");
        let conn = initialize(path.to_str().unwrap()).unwrap();
        assert_eq!(schema::table_count(&conn).unwrap(), 3);
        drop(conn);
        assert!(open(path.to_str().unwrap()).is_ok());
    }
}
