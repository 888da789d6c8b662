// Analysis reports: the structured result of one concordance analysis.
//
// A CompositeResult is assembled once per analysis and never mutated. Its
// JSON form is a nested mapping keyed by model identifier; the per-model
// maps are written in registration order so reports diff cleanly.

pub mod builder;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::scorer::{ModelOutcome, OutcomeStatus};
use crate::scoring::composite::WeightedContribution;
use crate::scoring::risk::{RiskAssessment, RiskLevel};

pub use builder::{build_summary, confidence_label, recommendations};

/// How much of the detector set backed this analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Human-facing summary of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// "k/n": successful models over total registered models.
    pub models_analyzed: String,
    /// Composite score formatted to three decimals.
    pub composite_score: String,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub analysis_confidence: Confidence,
    /// No model succeeded, so the 0.0 composite carries no evidence.
    pub insufficient_data: bool,
    #[serde(skip)]
    pub successful_models: usize,
    #[serde(skip)]
    pub total_models: usize,
}

/// Everything one analysis produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeResult {
    pub input_id: String,
    pub timestamp: DateTime<Utc>,
    /// One per registered model, in registration order.
    pub outcomes: Vec<ModelOutcome>,
    pub composite_score: f64,
    /// Successful models only, in registration order.
    pub breakdown: Vec<WeightedContribution>,
    pub risk: RiskAssessment,
    pub summary: Summary,
}

impl CompositeResult {
    pub fn outcome(&self, model_id: &str) -> Option<&ModelOutcome> {
        self.outcomes.iter().find(|o| o.model_id == model_id)
    }

    pub fn successful_outcomes(&self) -> impl Iterator<Item = &ModelOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for CompositeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(7))?;
        map.serialize_entry("tweet_id", &self.input_id)?;
        map.serialize_entry(
            "timestamp",
            &self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        )?;
        map.serialize_entry("model_results", &ModelResults(&self.outcomes))?;
        map.serialize_entry("composite_score", &self.composite_score)?;
        map.serialize_entry("weighted_breakdown", &Breakdown(&self.breakdown))?;
        map.serialize_entry("risk_assessment", &self.risk)?;
        map.serialize_entry("summary", &self.summary)?;
        map.end()
    }
}

/// Serializes outcomes as `{model_id: {...}}` in outcome order.
struct ModelResults<'a>(&'a [ModelOutcome]);

#[derive(Serialize)]
struct ModelResultEntry<'a> {
    score: Option<f64>,
    status: OutcomeStatus,
    raw_result: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    elapsed_ms: u64,
}

impl Serialize for ModelResults<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|o| {
            (
                o.model_id.as_str(),
                ModelResultEntry {
                    score: o.score,
                    status: o.status,
                    raw_result: o.raw_output.as_deref(),
                    error: o.error.as_deref(),
                    elapsed_ms: o.elapsed_ms,
                },
            )
        }))
    }
}

/// Serializes contributions as `{model_id: {...}}` in breakdown order.
struct Breakdown<'a>(&'a [WeightedContribution]);

impl Serialize for Breakdown<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|c| (c.model_id.as_str(), c)))
    }
}
