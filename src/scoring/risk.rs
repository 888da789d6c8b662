// Risk classification and ranked risk factors.
//
// The composite score maps onto five ordinal levels with closed lower
// bounds, so a score sitting exactly on a threshold lands in the higher
// level. Risk factors are the individual detectors that fired strongly,
// ranked by how much they moved the composite.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::scorer::ModelOutcome;

/// How many risk factors an assessment reports by default.
pub const DEFAULT_TOP_FACTORS: usize = 3;

/// A detector only counts as a risk factor above this score (exclusive).
pub const RISK_FACTOR_MIN_SCORE: f64 = 0.5;

/// Ordinal risk category for a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    /// Determine the level from a composite score (0.0-1.0).
    ///
    /// Negative and NaN scores fail every comparison and fall to Minimal.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 0.8 => RiskLevel::Critical,
            s if s >= 0.6 => RiskLevel::High,
            s if s >= 0.4 => RiskLevel::Moderate,
            s if s >= 0.2 => RiskLevel::Low,
            _ => RiskLevel::Minimal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Minimal => "MINIMAL",
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Very high manipulation risk detected across multiple dimensions",
            RiskLevel::High => "High manipulation risk with concerning patterns",
            RiskLevel::Moderate => "Moderate risk with some concerning indicators",
            RiskLevel::Low => "Low risk with minimal concerning indicators",
            RiskLevel::Minimal => "Minimal risk, appears to be genuine engagement",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map a composite score to its level. Pure: same score, same level.
pub fn classify(composite_score: f64) -> RiskLevel {
    RiskLevel::from_score(composite_score)
}

/// One detector's contribution to the overall risk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFactor {
    pub model: String,
    pub score: f64,
    pub weight: f64,
}

impl RiskFactor {
    pub fn weighted_contribution(&self) -> f64 {
        self.score * self.weight
    }
}

/// Risk level, its description, and the strongest contributing detectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub risk_description: String,
    pub top_risk_factors: Vec<RiskFactor>,
    pub composite_score: f64,
}

/// Pick the successful outcomes scoring above 0.5, ranked by
/// `score * weight` descending, and keep the first `n`.
///
/// `outcomes` must be in registration order: the sort is stable, so equal
/// contributions keep that order.
pub fn top_risk_factors(
    outcomes: &[ModelOutcome],
    weights: &HashMap<String, f64>,
    n: usize,
) -> Vec<RiskFactor> {
    let mut factors: Vec<RiskFactor> = outcomes
        .iter()
        .filter_map(|o| {
            let score = o.valid_score()?;
            let weight = *weights.get(&o.model_id)?;
            (score > RISK_FACTOR_MIN_SCORE).then(|| RiskFactor {
                model: o.model_id.clone(),
                score,
                weight,
            })
        })
        .collect();

    factors.sort_by(|a, b| {
        b.weighted_contribution()
            .partial_cmp(&a.weighted_contribution())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    factors.truncate(n);
    factors
}

/// Build the full assessment for a composite score.
pub fn assess_risk(
    composite_score: f64,
    outcomes: &[ModelOutcome],
    weights: &HashMap<String, f64>,
) -> RiskAssessment {
    let risk_level = classify(composite_score);
    RiskAssessment {
        risk_level,
        risk_description: risk_level.description().to_string(),
        top_risk_factors: top_risk_factors(outcomes, weights, DEFAULT_TOP_FACTORS),
        composite_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::OutcomeStatus;

    fn weights(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_thresholds_land_in_higher_bucket() {
        assert_eq!(classify(0.2), RiskLevel::Low);
        assert_eq!(classify(0.4), RiskLevel::Moderate);
        assert_eq!(classify(0.6), RiskLevel::High);
        assert_eq!(classify(0.8), RiskLevel::Critical);
        assert_eq!(classify(1.0), RiskLevel::Critical);
        assert_eq!(classify(0.0), RiskLevel::Minimal);
    }

    #[test]
    fn test_just_below_thresholds() {
        assert_eq!(classify(0.1999), RiskLevel::Minimal);
        assert_eq!(classify(0.3999), RiskLevel::Low);
        assert_eq!(classify(0.5999), RiskLevel::Moderate);
        assert_eq!(classify(0.7999), RiskLevel::High);
    }

    #[test]
    fn test_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&RiskLevel::Moderate).unwrap(),
            "\"MODERATE\""
        );
    }

    #[test]
    fn test_factors_filter_by_status_and_threshold() {
        let outcomes = vec![
            ModelOutcome::success("a", 0.9, None),
            ModelOutcome::success("b", 0.5, None), // not strictly above 0.5
            ModelOutcome::failure("c", OutcomeStatus::Timeout, None, None),
            ModelOutcome::success("d", 0.51, None),
        ];
        let w = weights(&[("a", 1.0), ("b", 1.0), ("c", 1.0), ("d", 1.0)]);
        let factors = top_risk_factors(&outcomes, &w, 3);
        let names: Vec<&str> = factors.iter().map(|f| f.model.as_str()).collect();
        assert_eq!(names, vec!["a", "d"]);
    }

    #[test]
    fn test_factors_ranked_by_weighted_contribution() {
        // 0.9 * 0.5 = 0.45 ranks below 0.7 * 1.0 = 0.70
        let outcomes = vec![
            ModelOutcome::success("light", 0.9, None),
            ModelOutcome::success("heavy", 0.7, None),
        ];
        let w = weights(&[("light", 0.5), ("heavy", 1.0)]);
        let factors = top_risk_factors(&outcomes, &w, 3);
        assert_eq!(factors[0].model, "heavy");
        assert_eq!(factors[1].model, "light");
    }

    #[test]
    fn test_factors_truncated_to_n() {
        let outcomes: Vec<ModelOutcome> = (0..6)
            .map(|i| ModelOutcome::success(&format!("m{i}"), 0.6 + i as f64 * 0.05, None))
            .collect();
        let w: HashMap<String, f64> = (0..6).map(|i| (format!("m{i}"), 1.0)).collect();
        let factors = top_risk_factors(&outcomes, &w, 3);
        assert_eq!(factors.len(), 3);
        assert_eq!(factors[0].model, "m5");
    }
}
