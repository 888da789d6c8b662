// Subprocess scorer: runs each detector as its own process.
//
// Protocol: the detector receives the input id as its only argument, prints
// one float in [0, 1] on stdout, and exits 0. Anything it wants to say goes
// to stderr. A non-zero exit means failure.
//
// Each child runs in its own process group so a timeout can take down the
// whole tree (interpreters that fork helpers, shell wrappers, etc.), and is
// marked kill_on_drop so an abandoned invocation never leaks a process.

use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::traits::{in_score_range, ModelOutcome, ModelScorer, OutcomeStatus};
use crate::registry::{ModelSpec, ScorerCommand};

/// Per-model wall-clock budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs detectors as child processes with a hard timeout.
#[derive(Debug, Clone)]
pub struct SubprocessScorer {
    timeout: Duration,
}

impl Default for SubprocessScorer {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl SubprocessScorer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, spec: &ModelSpec, input_id: &str) -> ModelOutcome {
        let child = match build_command(&spec.command, input_id).spawn() {
            Ok(child) => child,
            Err(e) => {
                return ModelOutcome::failure(
                    &spec.id,
                    OutcomeStatus::Error,
                    None,
                    Some(format!(
                        "failed to start {}: {e}",
                        spec.command.script.display()
                    )),
                );
            }
        };
        let pid = child.id();

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => outcome_from_output(&spec.id, &output),
            Ok(Err(e)) => ModelOutcome::failure(
                &spec.id,
                OutcomeStatus::Error,
                None,
                Some(format!("failed to collect scorer output: {e}")),
            ),
            Err(_) => {
                // The child itself is already gone (kill_on_drop); this
                // reaches anything it spawned.
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                ModelOutcome::failure(
                    &spec.id,
                    OutcomeStatus::Timeout,
                    None,
                    Some(format!(
                        "scorer exceeded {:.1}s timeout",
                        self.timeout.as_secs_f64()
                    )),
                )
            }
        }
    }
}

#[async_trait]
impl ModelScorer for SubprocessScorer {
    async fn invoke(&self, spec: &ModelSpec, input_id: &str) -> ModelOutcome {
        let started = Instant::now();
        let outcome = self.run(spec, input_id).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        debug!(
            model = spec.id,
            input_id,
            status = outcome.status.as_str(),
            elapsed_ms,
            "Scorer finished"
        );

        outcome.with_elapsed_ms(elapsed_ms)
    }
}

fn build_command(command: &ScorerCommand, input_id: &str) -> Command {
    let mut cmd = match &command.interpreter {
        Some(interpreter) => {
            let mut cmd = Command::new(interpreter);
            cmd.arg(&command.script);
            cmd
        }
        None => Command::new(&command.script),
    };

    cmd.arg(input_id)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

/// Turn a finished process into an outcome.
fn outcome_from_output(model_id: &str, output: &Output) -> ModelOutcome {
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = match (stderr.is_empty(), output.status.code()) {
            (false, _) => stderr,
            (true, Some(code)) => format!("scorer exited with status {code}"),
            (true, None) => "scorer terminated by signal".to_string(),
        };
        return ModelOutcome::failure(
            model_id,
            OutcomeStatus::Error,
            non_empty(stdout.trim()),
            Some(detail),
        );
    }

    parse_score_output(model_id, &stdout)
}

/// Parse a successful scorer's stdout: one float literal, surrounding
/// whitespace ignored, in [0, 1].
pub fn parse_score_output(model_id: &str, stdout: &str) -> ModelOutcome {
    let text = stdout.trim();

    match text.parse::<f64>() {
        Ok(score) if in_score_range(score) => {
            ModelOutcome::success(model_id, score, Some(text.to_string()))
        }
        Ok(score) => {
            warn!(model = model_id, score, "Scorer returned out-of-range score");
            ModelOutcome::failure(
                model_id,
                OutcomeStatus::InvalidScore,
                Some(text.to_string()),
                Some(format!("score {score} outside [0, 1]")),
            )
        }
        Err(_) => {
            warn!(model = model_id, output = text, "Scorer returned non-numeric output");
            ModelOutcome::failure(
                model_id,
                OutcomeStatus::InvalidScore,
                Some(text.to_string()),
                Some("output is not a single number".to_string()),
            )
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal. A group that no longer exists
    // yields ESRCH, which is the expected case when the child had no
    // descendants.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pgid, "Process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_whitespace_is_trimmed() {
        let outcome = parse_score_output("m", "0.42\n");
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.score, Some(0.42));
        assert_eq!(outcome.raw_output.as_deref(), Some("0.42"));
    }

    #[test]
    fn test_out_of_range_is_invalid_not_clamped() {
        let outcome = parse_score_output("m", "1.5");
        assert_eq!(outcome.status, OutcomeStatus::InvalidScore);
        assert_eq!(outcome.score, None);
        assert_eq!(outcome.raw_output.as_deref(), Some("1.5"));

        let outcome = parse_score_output("m", "-0.1");
        assert_eq!(outcome.status, OutcomeStatus::InvalidScore);
    }

    #[test]
    fn test_bounds_are_valid() {
        assert_eq!(parse_score_output("m", "0").score, Some(0.0));
        assert_eq!(parse_score_output("m", "1.0").score, Some(1.0));
    }

    #[test]
    fn test_negative_zero_is_reported_as_zero() {
        let outcome = parse_score_output("m", "-0.0");
        assert_eq!(outcome.status, OutcomeStatus::Success);
        let score = outcome.score.unwrap();
        assert!(score == 0.0 && score.is_sign_positive());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["score"].to_string(), "0.0");
    }

    #[test]
    fn test_non_numeric_output_preserved() {
        let outcome = parse_score_output("m", "Score: 0.7\n");
        assert_eq!(outcome.status, OutcomeStatus::InvalidScore);
        assert_eq!(outcome.raw_output.as_deref(), Some("Score: 0.7"));
    }

    #[test]
    fn test_empty_and_nan_output_invalid() {
        assert_eq!(
            parse_score_output("m", "   \n").status,
            OutcomeStatus::InvalidScore
        );
        assert_eq!(
            parse_score_output("m", "NaN").status,
            OutcomeStatus::InvalidScore
        );
    }

    #[test]
    fn test_multiple_values_invalid() {
        let outcome = parse_score_output("m", "0.3\n0.4\n");
        assert_eq!(outcome.status, OutcomeStatus::InvalidScore);
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_uses_stderr() {
        use std::os::unix::process::ExitStatusExt;

        let output = Output {
            status: std::process::ExitStatus::from_raw(1 << 8),
            stdout: b"0.9\n".to_vec(),
            stderr: b"database unreachable\n".to_vec(),
        };
        let outcome = outcome_from_output("m", &output);
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!(outcome.score, None);
        assert_eq!(outcome.error.as_deref(), Some("database unreachable"));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_without_stderr_reports_code() {
        use std::os::unix::process::ExitStatusExt;

        let output = Output {
            status: std::process::ExitStatus::from_raw(3 << 8),
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let outcome = outcome_from_output("m", &output);
        assert_eq!(
            outcome.error.as_deref(),
            Some("scorer exited with status 3")
        );
    }
}
