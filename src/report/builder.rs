// Summary builder: confidence label and recommendations.
//
// Both are pure functions of counts and the composite score. Thresholds
// are fixed: 7+ successful models is high confidence, 4+ is medium.

use super::{Confidence, Summary};
use crate::scorer::ModelOutcome;
use crate::scoring::risk::RiskLevel;

pub const HIGH_CONFIDENCE_MIN_MODELS: usize = 7;
pub const MEDIUM_CONFIDENCE_MIN_MODELS: usize = 4;

/// Confidence label for a number of successful models.
pub fn confidence_label(successful_models: usize) -> Confidence {
    if successful_models >= HIGH_CONFIDENCE_MIN_MODELS {
        Confidence::High
    } else if successful_models >= MEDIUM_CONFIDENCE_MIN_MODELS {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Plain-language recommendations for a composite score.
///
/// Each trigger is independent: a score of 0.65 gets both the ≥0.6 and the
/// ≥0.4 recommendations.
pub fn recommendations(composite_score: f64) -> Vec<String> {
    let mut recs = Vec::new();
    if composite_score >= 0.6 {
        recs.push("Consider flagging for manual review".to_string());
        recs.push("Monitor for similar patterns".to_string());
    }
    if composite_score >= 0.4 {
        recs.push("Review engagement patterns".to_string());
    }
    if composite_score < 0.2 {
        recs.push("Engagement appears genuine".to_string());
    }
    recs
}

/// Build the summary for an analysis.
///
/// `total_models` is the number of registered models, including any that
/// were skipped as unavailable.
pub fn build_summary(
    composite_score: f64,
    risk_level: RiskLevel,
    outcomes: &[ModelOutcome],
    total_models: usize,
) -> Summary {
    let successful_models = outcomes.iter().filter(|o| o.is_success()).count();

    Summary {
        models_analyzed: format!("{successful_models}/{total_models}"),
        composite_score: format!("{composite_score:.3}"),
        risk_level,
        recommendations: recommendations(composite_score),
        analysis_confidence: confidence_label(successful_models),
        insufficient_data: successful_models == 0,
        successful_models,
        total_models,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::OutcomeStatus;

    #[test]
    fn test_confidence_thresholds() {
        assert_eq!(confidence_label(10), Confidence::High);
        assert_eq!(confidence_label(7), Confidence::High);
        assert_eq!(confidence_label(6), Confidence::Medium);
        assert_eq!(confidence_label(4), Confidence::Medium);
        assert_eq!(confidence_label(3), Confidence::Low);
        assert_eq!(confidence_label(0), Confidence::Low);
    }

    #[test]
    fn test_recommendations_are_cumulative() {
        let recs = recommendations(0.65);
        assert_eq!(
            recs,
            vec![
                "Consider flagging for manual review",
                "Monitor for similar patterns",
                "Review engagement patterns",
            ]
        );
    }

    #[test]
    fn test_recommendations_bands() {
        assert_eq!(recommendations(0.45), vec!["Review engagement patterns"]);
        assert!(recommendations(0.3).is_empty());
        assert_eq!(recommendations(0.1), vec!["Engagement appears genuine"]);
        assert_eq!(recommendations(0.0), vec!["Engagement appears genuine"]);
    }

    #[test]
    fn test_summary_counts_and_formatting() {
        let outcomes = vec![
            ModelOutcome::success("a", 0.5, None),
            ModelOutcome::failure("b", OutcomeStatus::Error, None, None),
        ];
        let summary = build_summary(0.5, RiskLevel::Moderate, &outcomes, 10);
        assert_eq!(summary.models_analyzed, "1/10");
        assert_eq!(summary.composite_score, "0.500");
        assert_eq!(summary.analysis_confidence, Confidence::Low);
        assert!(!summary.insufficient_data);
    }

    #[test]
    fn test_summary_flags_insufficient_data() {
        let outcomes = vec![ModelOutcome::failure("a", OutcomeStatus::Timeout, None, None)];
        let summary = build_summary(0.0, RiskLevel::Minimal, &outcomes, 1);
        assert!(summary.insufficient_data);
        assert_eq!(summary.models_analyzed, "0/1");
    }
}
