// Model scorer trait: the one seam between the aggregator and detectors.
//
// Every detector is driven through the same call: a ModelSpec and an input
// id go in, a ModelOutcome comes out. Implementations never return errors;
// each failure mode becomes an OutcomeStatus on the outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::registry::ModelSpec;

/// How a single model invocation resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    /// Output present but not a number, or a number outside [0, 1].
    InvalidScore,
    /// Structured output did not contain the model's result key.
    KeyNotFound,
    /// Non-zero exit, spawn failure, or any other fault.
    Error,
    Timeout,
    /// Failed availability validation; never invoked.
    SkippedUnloaded,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::InvalidScore => "invalid_score",
            OutcomeStatus::KeyNotFound => "key_not_found",
            OutcomeStatus::Error => "error",
            OutcomeStatus::Timeout => "timeout",
            OutcomeStatus::SkippedUnloaded => "skipped_unloaded",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The result of running one model against one input.
///
/// `score` is `Some` only when `status` is `Success`. Build outcomes through
/// the constructors so that holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelOutcome {
    pub model_id: String,
    pub status: OutcomeStatus,
    pub score: Option<f64>,
    /// What the scorer produced, kept for diagnostics.
    pub raw_output: Option<String>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl ModelOutcome {
    pub fn success(model_id: &str, score: f64, raw_output: Option<String>) -> Self {
        Self {
            model_id: model_id.to_string(),
            status: OutcomeStatus::Success,
            // Adding +0.0 folds -0.0 into 0.0.
            score: Some(score + 0.0),
            raw_output,
            error: None,
            elapsed_ms: 0,
        }
    }

    /// A non-success outcome. `Success` is not a failure status; passing it
    /// here is downgraded to `Error` so `score` and `status` stay consistent.
    pub fn failure(
        model_id: &str,
        status: OutcomeStatus,
        raw_output: Option<String>,
        error: Option<String>,
    ) -> Self {
        let status = match status {
            OutcomeStatus::Success => OutcomeStatus::Error,
            other => other,
        };
        Self {
            model_id: model_id.to_string(),
            status,
            score: None,
            raw_output,
            error,
            elapsed_ms: 0,
        }
    }

    pub fn skipped(model_id: &str, reason: &str) -> Self {
        Self::failure(
            model_id,
            OutcomeStatus::SkippedUnloaded,
            None,
            Some(reason.to_string()),
        )
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// The score, only if this outcome counts toward the composite.
    pub fn valid_score(&self) -> Option<f64> {
        if self.is_success() {
            self.score
        } else {
            None
        }
    }
}

/// Accept a score only if it is a real number in [0, 1] inclusive.
///
/// Scorers must clamp their own output; values outside the range are a
/// contract violation and are reported, not corrected.
pub fn in_score_range(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Trait for running a detector. Async because the standard implementation
/// waits on a child process.
#[async_trait]
pub trait ModelScorer: Send + Sync {
    /// Run `spec` against `input_id`. Must not panic or block past the
    /// implementation's own time budget.
    async fn invoke(&self, spec: &ModelSpec, input_id: &str) -> ModelOutcome;
}
