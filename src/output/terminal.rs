// Colored terminal output for analyses, batch runs and stored reports.
//
// main.rs hands finished results here; nothing in this module computes
// scores.

use colored::Colorize;

use crate::db::models::StoredAnalysis;
use crate::pipeline::batch::{BatchStats, ERROR_LABEL};
use crate::registry::{Availability, ModelRegistry};
use crate::report::CompositeResult;
use crate::scorer::{ModelOutcome, OutcomeStatus};

/// Display the full report for one analysis.
pub fn display_report(result: &CompositeResult) {
    println!(
        "\n{}",
        format!("=== Engagement Concordance: {} ===", result.input_id).bold()
    );
    println!(
        "  Analyzed at:     {}",
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Composite score: {:.3}", result.composite_score);

    println!("\n  {}", "Risk assessment".bold());
    println!(
        "    Level: {}",
        colorize_level(result.risk.risk_level.as_str())
    );
    println!("    {}", result.risk.risk_description);
    if !result.risk.top_risk_factors.is_empty() {
        println!("    Top risk factors:");
        for (i, factor) in result.risk.top_risk_factors.iter().enumerate() {
            println!(
                "      {}. {} {:.3} (weight {})",
                i + 1,
                factor.model,
                factor.score,
                factor.weight
            );
        }
    }

    println!("\n  {}", "Model breakdown".bold());
    display_outcomes(result);

    let summary = &result.summary;
    println!("\n  {}", "Summary".bold());
    println!("    Models analyzed: {}", summary.models_analyzed);
    println!(
        "    Confidence:      {}",
        summary.analysis_confidence.as_str().to_uppercase()
    );
    if summary.insufficient_data {
        println!(
            "    {}",
            "No model produced a score; the composite carries no evidence.".yellow()
        );
    }
    for rec in &summary.recommendations {
        println!("    - {rec}");
    }
    println!();
}

fn display_outcomes(result: &CompositeResult) {
    println!(
        "    {:<26} {:<17} {:>6} {:>6} {:>8} {:>7}",
        "Model".dimmed(),
        "Status".dimmed(),
        "Score".dimmed(),
        "Weight".dimmed(),
        "Contrib".dimmed(),
        "ms".dimmed(),
    );
    println!("    {}", "-".repeat(75).dimmed());

    for outcome in &result.outcomes {
        let contribution = result
            .breakdown
            .iter()
            .find(|c| c.model_id == outcome.model_id);

        match contribution {
            Some(c) => println!(
                "    {:<26} {:<17} {:>6.3} {:>6.1} {:>8.3} {:>7}",
                outcome.model_id,
                colorize_status(outcome.status),
                c.raw_score,
                c.weight,
                c.weighted_contribution,
                outcome.elapsed_ms,
            ),
            None => {
                println!(
                    "    {:<26} {:<17} {:>6} {:>6} {:>8} {:>7}",
                    outcome.model_id,
                    colorize_status(outcome.status),
                    "-",
                    "-",
                    "-",
                    outcome.elapsed_ms,
                );
                if let Some(detail) = failure_detail(outcome) {
                    println!("      {}", detail.dimmed());
                }
            }
        }
    }
}

fn failure_detail(outcome: &ModelOutcome) -> Option<String> {
    outcome
        .error
        .as_deref()
        .map(|e| super::truncate_chars(e, 90))
}

/// Display every registered model with its availability.
pub fn display_models(registry: &ModelRegistry) {
    println!(
        "\n{}",
        format!("=== Registered models ({}) ===", registry.len()).bold()
    );
    println!();

    for (spec, availability) in registry.entries() {
        let state = match availability {
            Availability::Available => "ok".green(),
            Availability::Unchecked => "unchecked".dimmed(),
            Availability::Unavailable { .. } => "unavailable".red(),
        };
        println!(
            "  {:<26} w={:<4} {:<12} {}",
            spec.id,
            spec.weight,
            state,
            spec.command.script.display().to_string().dimmed()
        );
        if let Availability::Unavailable { reason } = availability {
            println!("    {}", reason.yellow());
        }
    }

    let available = registry
        .entries()
        .filter(|(_, a)| matches!(a, Availability::Available))
        .count();
    println!("\n  {available}/{} models available", registry.len());
}

/// Display a single model's outcome from `run-model`.
pub fn display_single_outcome(outcome: &ModelOutcome) {
    println!(
        "{}: {} ({} ms)",
        outcome.model_id.bold(),
        colorize_status(outcome.status),
        outcome.elapsed_ms
    );
    if let Some(score) = outcome.valid_score() {
        println!("  Score: {score:.3}");
    }
    if let Some(raw) = outcome.raw_output.as_deref() {
        println!("  Output: {}", super::truncate_chars(raw.trim(), 200).dimmed());
    }
    if let Some(error) = outcome.error.as_deref() {
        println!("  Error: {}", error.yellow());
    }
}

/// Display the statistics that close a batch run.
pub fn display_batch_summary(stats: &BatchStats) {
    println!("\n{}", "=== Batch summary ===".bold());
    println!("  Inputs:     {}", stats.total);
    println!("  Successful: {}", stats.succeeded.to_string().green());
    if stats.failed > 0 {
        println!("  Failed:     {}", stats.failed.to_string().red());
    } else {
        println!("  Failed:     0");
    }
    println!("  Average composite: {:.3}", stats.mean_score);
    println!(
        "  Score range:       {:.3} - {:.3}",
        stats.min_score, stats.max_score
    );

    println!("\n  Risk distribution:");
    for (label, count) in &stats.distribution {
        let pct = *count as f64 / stats.total as f64 * 100.0;
        println!("    {:<9} {:>4} ({pct:.1}%)", colorize_level(label), count);
    }
}

/// Display stored analyses, highest composite first.
pub fn display_stored_analyses(analyses: &[StoredAnalysis]) {
    if analyses.is_empty() {
        println!("No analyses stored yet. Run `concordance analyze` or `concordance batch` first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Stored analyses ({}) ===", analyses.len()).bold()
    );
    println!();
    println!(
        "  {:>4}  {:<22} {:>7}  {:<9} {:>7}  {:<7} {}",
        "Rank".dimmed(),
        "Input".dimmed(),
        "Score".dimmed(),
        "Level".dimmed(),
        "Models".dimmed(),
        "Conf".dimmed(),
        "Analyzed".dimmed(),
    );
    println!("  {}", "-".repeat(84).dimmed());

    for (i, analysis) in analyses.iter().enumerate() {
        let marker = if analysis.insufficient_data { " *" } else { "" };
        println!(
            "  {:>4}. {:<22} {:>7.3}  {:<9} {:>7}  {:<7} {}{}",
            i + 1,
            analysis.input_id,
            analysis.composite_score,
            colorize_level(&analysis.risk_level),
            analysis.models_analyzed,
            analysis.analysis_confidence,
            analysis.analyzed_at.dimmed(),
            marker,
        );
    }

    if analyses.iter().any(|a| a.insufficient_data) {
        println!("\n  * no model produced a score for this input");
    }
}

/// Colorize a risk level label.
pub fn colorize_level(level: &str) -> colored::ColoredString {
    match level {
        "CRITICAL" => level.red().bold(),
        "HIGH" => level.bright_red(),
        "MODERATE" => level.yellow(),
        "LOW" => level.green(),
        "MINIMAL" => level.bright_green(),
        ERROR_LABEL => level.magenta(),
        _ => level.dimmed(),
    }
}

fn colorize_status(status: OutcomeStatus) -> colored::ColoredString {
    let s = status.as_str();
    match status {
        OutcomeStatus::Success => s.green(),
        OutcomeStatus::Timeout => s.yellow(),
        OutcomeStatus::SkippedUnloaded => s.dimmed(),
        OutcomeStatus::InvalidScore | OutcomeStatus::KeyNotFound | OutcomeStatus::Error => s.red(),
    }
}
