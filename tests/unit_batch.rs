// Batch runs: error rows, persistence, CSV output.

use std::sync::Arc;

use anyhow::anyhow;
use serde_json::json;

use concordance::db::Database;
use concordance::output::csv;
use concordance::pipeline::batch::{self, BatchRow};
use concordance::pipeline::Aggregator;
use concordance::registry::{ModelRegistry, ModelSpec, ScorerCommand};
use concordance::scorer::keyed::KeyedScorer;
use concordance::scorer::ModelScorer;

fn spec(id: &str) -> ModelSpec {
    ModelSpec {
        id: id.to_string(),
        weight: 1.0,
        command: ScorerCommand::direct(format!("/models/{id}")),
        score_key: "score".to_string(),
    }
}

/// Two models: "steady" always scores 0.5, "picky" fails on input 2.
fn aggregator() -> Aggregator {
    let registry = ModelRegistry::from_specs([spec("steady"), spec("picky")]).unwrap();
    let scorer = KeyedScorer::new()
        .with_model("steady", |_| Ok(json!({ "score": 0.5 })))
        .with_model("picky", |id| {
            if id == "2" {
                Err(anyhow!("no data for input"))
            } else {
                Ok(json!({ "score": 0.9 }))
            }
        });
    let scorer: Arc<dyn ModelScorer> = Arc::new(scorer);
    Aggregator::new(Arc::new(registry), scorer)
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn invalid_ids_become_error_rows_in_place() {
    let rows = batch::run(&aggregator(), None, &ids(&["1", "abc", "2"]), false)
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    let order: Vec<&str> = rows.iter().map(|r| r.input_id()).collect();
    assert_eq!(order, vec!["1", "abc", "2"]);
    assert!(!rows[0].is_failed());
    assert!(rows[1].is_failed());
    assert_eq!(rows[1].risk_label(), "ERROR");
    // A partial model failure is still an analyzed row
    assert!(!rows[2].is_failed());
}

#[tokio::test]
async fn batch_statistics() {
    let rows = batch::run(&aggregator(), None, &ids(&["1", "abc", "2"]), false)
        .await
        .unwrap();
    let stats = batch::summarize(&rows).unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.succeeded, 2);
    assert_eq!(stats.failed, 1);
    // "1" -> 0.7, "2" -> 0.5, "abc" counts as 0.0
    assert!((stats.mean_score - 0.4).abs() < 1e-9);
    assert_eq!(stats.min_score, 0.0);
    assert!((stats.max_score - 0.7).abs() < 1e-9);
    assert_eq!(
        stats.distribution,
        vec![
            ("HIGH".to_string(), 1),
            ("MODERATE".to_string(), 1),
            ("ERROR".to_string(), 1)
        ]
    );
}

#[tokio::test]
async fn batch_saves_successful_analyses() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db = concordance::db::initialize_sqlite(db_path.to_str().unwrap()).unwrap();

    batch::run(&aggregator(), Some(&db), &ids(&["1", "abc", "2"]), false)
        .await
        .unwrap();

    assert_eq!(db.analysis_count().await.unwrap(), 2);
    let stored = db.get_analysis("2").await.unwrap().unwrap();
    assert_eq!(stored.models_analyzed, "1/2");
    assert_eq!(stored.risk_level, "MODERATE");
    assert!(db.get_analysis("abc").await.unwrap().is_none());

    let ranked = db.get_ranked_analyses(0.6, 10).await.unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].input_id, "1");
}

#[tokio::test]
async fn csv_rows_and_error_row() {
    let agg = aggregator();
    let rows = batch::run(&agg, None, &ids(&["2", "x,y"]), false)
        .await
        .unwrap();
    let text = csv::render(&rows, &agg.registry().ids());
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("timestamp,steady_score,picky_score"));

    // Analyzed row: the failed model's column is 0.0
    assert!(lines[1].starts_with("2,0.5,MODERATE,"));
    assert!(lines[1].ends_with(",0.5,0.0"));

    // Error row: quoted id, ERROR markers, empty model columns
    assert!(lines[2].starts_with("\"x,y\",0.0,ERROR,"));
    assert!(lines[2].contains("Analysis failed: input id 'x,y' is not numeric"));
    assert!(lines[2].contains(",0,ERROR,"));
    assert!(lines[2].ends_with(",,"));
}

#[test]
fn error_row_labels() {
    let row = BatchRow::Failed {
        input_id: "abc".to_string(),
        reason: "bad".to_string(),
        timestamp: chrono::Utc::now(),
    };
    assert_eq!(row.input_id(), "abc");
    assert_eq!(row.risk_label(), batch::ERROR_LABEL);
}
