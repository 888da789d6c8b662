// Subprocess scorer tests: real child processes running small /bin/sh
// scripts written to a scratch directory.
//
// Scripts are run through /bin/sh as an interpreter rather than exec'd
// directly, which avoids "text file busy" races on freshly written files.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use concordance::registry::{ModelSpec, ScorerCommand};
use concordance::scorer::subprocess::SubprocessScorer;
use concordance::scorer::{ModelScorer, OutcomeStatus};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    path
}

fn sh_spec(id: &str, script: PathBuf) -> ModelSpec {
    ModelSpec {
        id: id.to_string(),
        weight: 1.0,
        command: ScorerCommand::interpreted("/bin/sh", script),
        score_key: format!("{id}_score"),
    }
}

fn scorer() -> SubprocessScorer {
    SubprocessScorer::new(Duration::from_secs(5))
}

// ============================================================
// Output parsing
// ============================================================

#[tokio::test]
async fn trailing_newline_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "ok.sh", "printf '0.42\\n'");

    let outcome = scorer().invoke(&sh_spec("ok", script), "123").await;

    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.score, Some(0.42));
    assert_eq!(outcome.raw_output.as_deref(), Some("0.42"));
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn input_id_is_the_only_argument() {
    let dir = tempfile::tempdir().unwrap();
    // Echo back 0.<argc><first arg> so both are visible in the score.
    let script = write_script(dir.path(), "args.sh", "echo \"0.$#$1\"");

    let outcome = scorer().invoke(&sh_spec("args", script), "77").await;

    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.score, Some(0.177));
}

#[tokio::test]
async fn out_of_range_score_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "high.sh", "echo 1.5");

    let outcome = scorer().invoke(&sh_spec("high", script), "123").await;

    assert_eq!(outcome.status, OutcomeStatus::InvalidScore);
    assert!(outcome.score.is_none());
    assert_eq!(outcome.raw_output.as_deref(), Some("1.5"));
}

#[tokio::test]
async fn non_numeric_output_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "chatty.sh", "echo 'score: 0.5'");

    let outcome = scorer().invoke(&sh_spec("chatty", script), "123").await;

    assert_eq!(outcome.status, OutcomeStatus::InvalidScore);
    assert!(outcome.score.is_none());
}

#[tokio::test]
async fn stderr_noise_does_not_affect_score() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "noisy.sh",
        "echo 'loading weights...' >&2\necho 0.9",
    );

    let outcome = scorer().invoke(&sh_spec("noisy", script), "123").await;

    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.score, Some(0.9));
}

// ============================================================
// Failures
// ============================================================

#[tokio::test]
async fn non_zero_exit_reports_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "fail.sh", "echo 'model file missing' >&2\nexit 3");

    let outcome = scorer().invoke(&sh_spec("fail", script), "123").await;

    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert!(outcome.score.is_none());
    assert_eq!(outcome.error.as_deref(), Some("model file missing"));
}

#[tokio::test]
async fn non_zero_exit_without_stderr_reports_code() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "quiet.sh", "echo 0.5\nexit 2");

    let outcome = scorer().invoke(&sh_spec("quiet", script), "123").await;

    // A score printed before a failing exit is not trusted.
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert!(outcome.score.is_none());
    assert_eq!(outcome.error.as_deref(), Some("scorer exited with status 2"));
}

#[tokio::test]
async fn missing_program_is_an_error_outcome() {
    let spec = ModelSpec {
        id: "ghost".to_string(),
        weight: 1.0,
        command: ScorerCommand::direct("/definitely/not/here/simple_score.py"),
        score_key: "ghost_score".to_string(),
    };

    let outcome = scorer().invoke(&spec, "123").await;

    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert!(outcome
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("failed to start")));
}

// ============================================================
// Timeout
// ============================================================

#[tokio::test]
async fn slow_scorer_times_out_within_budget() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "slow.sh", "sleep 10\necho 0.5");
    let scorer = SubprocessScorer::new(Duration::from_secs(1));

    let started = Instant::now();
    let outcome = scorer.invoke(&sh_spec("slow", script), "123").await;
    let elapsed = started.elapsed();

    assert_eq!(outcome.status, OutcomeStatus::Timeout);
    assert!(outcome.score.is_none());
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");
    assert!(outcome.elapsed_ms >= 1000);
}

#[tokio::test]
async fn timeout_kills_processes_the_scorer_spawned() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("grandchild_ran");
    let script = write_script(
        dir.path(),
        "forks.sh",
        &format!("(sleep 3; touch '{}') &\nsleep 10\necho 0.5", marker.display()),
    );
    let scorer = SubprocessScorer::new(Duration::from_secs(1));

    let outcome = scorer.invoke(&sh_spec("forks", script), "123").await;
    assert_eq!(outcome.status, OutcomeStatus::Timeout);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(
        !marker.exists(),
        "background child outlived the timed-out scorer"
    );
}
