// The standard ten-detector registry.
//
// Each detector lives in its own directory under a shared models root and
// exposes a `simple_score.py` entry point that prints a single score.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{ModelRegistry, ModelSpec, ScorerCommand};

/// Entry-point script every standard detector provides.
pub const SCORER_SCRIPT: &str = "simple_score.py";

/// (identifier, weight, directory, result key), in registration order.
pub const STANDARD_MODELS: [(&str, f64, &str, &str); 10] = [
    ("hyperbole_falsehood", 0.6, "Hyperbole_Falsehood_detector", "manipulation_score"),
    ("clickbait", 0.8, "Clickbait_Headline_Classifier", "clickbait_score"),
    ("engagement_mismatch", 1.0, "Engagement_Mismatch_Detector", "mismatch_score"),
    ("content_recycling", 0.9, "Content_Recycling_Detector", "recycling_score"),
    ("coordinated_network", 1.0, "Coordinated_Account_Network_Model", "coordination_score"),
    ("emotive_manipulation", 0.6, "Emotive_Manipulation_Detector", "manipulation_score"),
    ("rapid_engagement_spike", 0.5, "Rapid_Engagement_Spike_Detector", "spike_score"),
    ("generic_comment", 0.6, "Generic_Comment_Detector", "generic_content_score"),
    ("authority_signal", 0.7, "Authority_Signal_Manipulation", "authority_score"),
    ("reply_bait", 0.8, "Reply_Bait_Detector", "reply_bait_score"),
];

/// Build the standard registry rooted at `models_root`.
///
/// When `interpreter` is `None` the scripts are run directly and must be
/// executable.
pub fn standard_registry(models_root: &Path, interpreter: Option<&Path>) -> Result<ModelRegistry> {
    ModelRegistry::from_specs(STANDARD_MODELS.iter().map(|&(id, weight, dir, key)| {
        let script: PathBuf = models_root.join(dir).join(SCORER_SCRIPT);
        let command = match interpreter {
            Some(interp) => ScorerCommand::interpreted(interp, script),
            None => ScorerCommand::direct(script),
        };
        ModelSpec {
            id: id.to_string(),
            weight,
            command,
            score_key: key.to_string(),
        }
    }))
}
