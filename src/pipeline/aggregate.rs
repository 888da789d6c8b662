// Aggregation pipeline: one input id → one CompositeResult.
//
// 1. Walk the registry in registration order
// 2. Invoke every active model (unavailable ones become skipped outcomes)
// 3. Combine the successful scores into the weighted composite
// 4. Classify the risk and build the summary
//
// Invocations run concurrently up to a limit. Each one carries its own
// timeout inside the scorer, so one slow detector never eats another's
// budget, and `buffered` hands results back in registration order no
// matter which finishes first.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::registry::{Availability, ModelRegistry};
use crate::report::{build_summary, CompositeResult};
use crate::scorer::{ModelOutcome, ModelScorer};
use crate::scoring::composite::compute_composite;
use crate::scoring::risk::assess_risk;

/// Max scorers running at once for a single analysis.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Runs every registered model for an input and combines the results.
#[derive(Clone)]
pub struct Aggregator {
    registry: Arc<ModelRegistry>,
    scorer: Arc<dyn ModelScorer>,
    concurrency: usize,
}

impl Aggregator {
    pub fn new(registry: Arc<ModelRegistry>, scorer: Arc<dyn ModelScorer>) -> Self {
        Self {
            registry,
            scorer,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Limit concurrent invocations. 1 runs models strictly one after another.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Analyze one input.
    ///
    /// Individual model failures never make this fail; they show up as
    /// outcome statuses. Only an empty registry (a setup bug) is an error.
    pub async fn analyze(&self, input_id: &str) -> Result<CompositeResult> {
        if self.registry.is_empty() {
            anyhow::bail!("No models registered; nothing to analyze");
        }

        info!(
            input_id,
            active = self.registry.active_specs().count(),
            total = self.registry.len(),
            "Starting analysis"
        );

        let outcomes = self.collect_outcomes(input_id).await;
        debug_assert_eq!(outcomes.len(), self.registry.len());

        let weights = self.registry.weights();
        let composite = compute_composite(&outcomes, &weights);
        let risk = assess_risk(composite.score, &outcomes, &weights);
        let summary = build_summary(
            composite.score,
            risk.risk_level,
            &outcomes,
            self.registry.len(),
        );

        info!(
            input_id,
            composite = format!("{:.3}", composite.score),
            risk = risk.risk_level.as_str(),
            models = summary.models_analyzed,
            "Analysis complete"
        );

        Ok(CompositeResult {
            input_id: input_id.to_string(),
            timestamp: Utc::now(),
            outcomes,
            composite_score: composite.score,
            breakdown: composite.breakdown,
            risk,
            summary,
        })
    }

    /// One outcome per registered model, in registration order.
    async fn collect_outcomes(&self, input_id: &str) -> Vec<ModelOutcome> {
        let scorer = self.scorer.as_ref();

        stream::iter(self.registry.entries())
            .map(|(spec, availability)| async move {
                let outcome = match availability {
                    Availability::Unavailable { reason } => ModelOutcome::skipped(&spec.id, reason),
                    _ => scorer.invoke(spec, input_id).await,
                };
                log_outcome(&outcome, spec.weight);
                outcome
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

fn log_outcome(outcome: &ModelOutcome, weight: f64) {
    match outcome.valid_score() {
        Some(score) => info!(
            model = outcome.model_id,
            score = format!("{score:.3}"),
            weight,
            contribution = format!("{:.3}", score * weight),
            elapsed_ms = outcome.elapsed_ms,
            "Model scored"
        ),
        None => warn!(
            model = outcome.model_id,
            status = outcome.status.as_str(),
            error = outcome.error.as_deref().unwrap_or(""),
            elapsed_ms = outcome.elapsed_ms,
            "Model produced no score"
        ),
    }
}
