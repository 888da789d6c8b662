// Weighted composite of per-model scores.
//
// Only successful outcomes take part: a failed, timed-out or skipped model
// adds nothing to either the weighted sum or the total weight. With no
// successes at all the composite is reported as 0.0 rather than NaN, so an
// all-failed run classifies as MINIMAL. The summary's `insufficient_data`
// flag is what distinguishes that case from a genuinely clean post.

use std::collections::HashMap;

use serde::Serialize;

use crate::scorer::ModelOutcome;

/// One successful model's share of the composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedContribution {
    #[serde(skip)]
    pub model_id: String,
    pub raw_score: f64,
    pub weight: f64,
    pub weighted_contribution: f64,
}

/// The composite score and how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub score: f64,
    pub weighted_sum: f64,
    pub total_weight: f64,
    /// Successful models only, in outcome order.
    pub breakdown: Vec<WeightedContribution>,
}

/// Weighted mean of the successful outcomes' scores.
///
/// Outcomes whose model has no weight entry are ignored; callers build
/// `weights` from the same registry that produced the outcomes.
pub fn compute_composite(outcomes: &[ModelOutcome], weights: &HashMap<String, f64>) -> Composite {
    let breakdown: Vec<WeightedContribution> = outcomes
        .iter()
        .filter_map(|o| {
            let score = o.valid_score()?;
            let weight = *weights.get(&o.model_id)?;
            Some(WeightedContribution {
                model_id: o.model_id.clone(),
                raw_score: score,
                weight,
                weighted_contribution: score * weight,
            })
        })
        .collect();

    let weighted_sum: f64 = breakdown.iter().map(|c| c.weighted_contribution).sum();
    let total_weight: f64 = breakdown.iter().map(|c| c.weight).sum();

    let score = if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    };

    Composite {
        score,
        weighted_sum,
        total_weight,
        breakdown,
    }
}
