// System status display: DB stats, last analysis, detector availability.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use crate::db::Database;
use crate::registry::ModelRegistry;

/// Display system status to the terminal.
///
/// `registry` should already be validated so availability is known.
pub async fn show(
    db: Option<&Arc<dyn Database>>,
    db_path: &str,
    registry: &ModelRegistry,
) -> Result<()> {
    match db {
        Some(db) if Path::new(db_path).exists() => {
            let file_size = std::fs::metadata(db_path)
                .map(|m| format_bytes(m.len()))
                .unwrap_or_else(|_| "unknown".to_string());
            println!("Database: {} ({})", db_path, file_size);

            let inputs = db.input_count().await?;
            println!("Stored input ids: {inputs}");
            if inputs == 0 {
                println!("  Run `concordance import <file>` to add ids for sampling");
            }

            let analyses = db.analysis_count().await?;
            println!("Stored analyses: {analyses}");

            match db.last_analyzed_at().await? {
                Some(at) => println!("Last analysis: {at}"),
                None => println!("Last analysis: never"),
            }
        }
        _ => {
            println!("Database: not initialized");
            println!("\nRun `concordance init` to set up the database.");
        }
    }

    let available = registry
        .entries()
        .filter(|(_, a)| !a.is_unavailable())
        .count();
    let line = format!("Models: {available}/{} available", registry.len());
    if available == registry.len() {
        println!("{}", line.green());
    } else if available == 0 {
        println!("{}", line.red());
    } else {
        println!("{}", line.yellow());
    }
    for (spec, availability) in registry.entries() {
        if availability.is_unavailable() {
            println!("  {} {}", "missing:".dimmed(), spec.id);
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
