// In-process scorer: detectors linked as functions instead of processes.
//
// Each function returns a JSON object of named fields; the score is read
// from the field named by the model's `score_key`. A missing field is
// reported as KeyNotFound.
//
// Functions run on the blocking pool under the same per-model budget as
// subprocess detectors, so a slow one cannot stall its siblings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::subprocess::DEFAULT_TIMEOUT;
use super::traits::{in_score_range, ModelOutcome, ModelScorer, OutcomeStatus};
use crate::registry::ModelSpec;

/// A linked detector: input id → object of result fields.
pub type ScoreFn = Arc<dyn Fn(&str) -> Result<Value> + Send + Sync>;

/// Scores models by calling registered functions.
pub struct KeyedScorer {
    functions: HashMap<String, ScoreFn>,
    timeout: Duration,
}

impl Default for KeyedScorer {
    fn default() -> Self {
        Self {
            functions: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl KeyedScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-model budget for each function call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register the function backing `model_id` (replacing any previous one).
    pub fn with_model<F>(mut self, model_id: &str, f: F) -> Self
    where
        F: Fn(&str) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(model_id.to_string(), Arc::new(f));
        self
    }
}

#[async_trait]
impl ModelScorer for KeyedScorer {
    async fn invoke(&self, spec: &ModelSpec, input_id: &str) -> ModelOutcome {
        let started = Instant::now();

        let outcome = match self.functions.get(&spec.id) {
            None => ModelOutcome::failure(
                &spec.id,
                OutcomeStatus::Error,
                None,
                Some("no scorer function linked for this model".to_string()),
            ),
            Some(f) => self.call(spec, Arc::clone(f), input_id).await,
        };

        outcome.with_elapsed_ms(started.elapsed().as_millis() as u64)
    }
}

impl KeyedScorer {
    async fn call(&self, spec: &ModelSpec, f: ScoreFn, input_id: &str) -> ModelOutcome {
        let input_id = input_id.to_string();
        let task = tokio::task::spawn_blocking(move || f(&input_id));

        // On timeout the blocking thread runs on to completion, but its
        // result is dropped.
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(fields))) => extract_keyed_score(spec, &fields),
            Ok(Ok(Err(e))) => ModelOutcome::failure(
                &spec.id,
                OutcomeStatus::Error,
                None,
                Some(format!("{e:#}")),
            ),
            Ok(Err(e)) if e.is_panic() => ModelOutcome::failure(
                &spec.id,
                OutcomeStatus::Error,
                None,
                Some("scorer panicked".to_string()),
            ),
            Ok(Err(e)) => ModelOutcome::failure(
                &spec.id,
                OutcomeStatus::Error,
                None,
                Some(format!("scorer task failed: {e}")),
            ),
            Err(_) => ModelOutcome::failure(
                &spec.id,
                OutcomeStatus::Timeout,
                None,
                Some(format!(
                    "scorer exceeded {:.1}s timeout",
                    self.timeout.as_secs_f64()
                )),
            ),
        }
    }
}

/// Read `spec.score_key` out of a detector's structured result.
pub fn extract_keyed_score(spec: &ModelSpec, fields: &Value) -> ModelOutcome {
    let raw = Some(fields.to_string());

    let Some(value) = fields.get(&spec.score_key) else {
        return ModelOutcome::failure(
            &spec.id,
            OutcomeStatus::KeyNotFound,
            raw,
            Some(format!("result has no '{}' field", spec.score_key)),
        );
    };

    match value.as_f64() {
        Some(score) if in_score_range(score) => ModelOutcome::success(&spec.id, score, raw),
        Some(score) => ModelOutcome::failure(
            &spec.id,
            OutcomeStatus::InvalidScore,
            raw,
            Some(format!("score {score} outside [0, 1]")),
        ),
        None => ModelOutcome::failure(
            &spec.id,
            OutcomeStatus::InvalidScore,
            raw,
            Some(format!("'{}' is not a number", spec.score_key)),
        ),
    }
}
