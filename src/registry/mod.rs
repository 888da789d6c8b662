// Model registry: the closed set of detectors an analysis runs.
//
// Each detector is declared once as a ModelSpec: identifier, weight, the
// command that runs it, and the result key it reports under. The registry
// is built at startup, validated once (which only checks that each scorer
// exists, never runs it), and then shared read-only for every analysis.
//
// Registration order is significant: it is the order outcomes appear in
// reports and the tie-break order for ranked risk factors.

pub mod standard;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// How to run a detector: a script, optionally through an interpreter.
///
/// With an interpreter the process is `<interpreter> <script> <input_id>`;
/// without one the script itself must be executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerCommand {
    #[serde(default)]
    pub interpreter: Option<PathBuf>,
    pub script: PathBuf,
}

impl ScorerCommand {
    /// Run the script directly.
    pub fn direct(script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: None,
            script: script.into(),
        }
    }

    /// Run the script through an interpreter (e.g. `python3`).
    pub fn interpreted(interpreter: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: Some(interpreter.into()),
            script: script.into(),
        }
    }
}

/// A single declared detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    /// Relative importance in the composite (positive, finite).
    pub weight: f64,
    pub command: ScorerCommand,
    /// Name of the field this detector reports its score under.
    pub score_key: String,
}

/// Result of checking whether a detector can be invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability {
    /// `validate()` has not run yet. Unchecked specs are treated as active.
    Unchecked,
    Available,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Availability::Unavailable { .. })
    }
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    spec: ModelSpec,
    availability: Availability,
}

/// Ordered, duplicate-free collection of detector specs.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entries: Vec<RegistryEntry>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from specs, in the order given.
    pub fn from_specs(specs: impl IntoIterator<Item = ModelSpec>) -> Result<Self> {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(spec)?;
        }
        Ok(registry)
    }

    /// Load a registry from a JSON array of specs.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model registry at {}", path.display()))?;
        let specs: Vec<ModelSpec> = serde_json::from_str(&json)
            .with_context(|| format!("Malformed model registry at {}", path.display()))?;
        Self::from_specs(specs)
    }

    /// Add a spec. Duplicate identifiers and non-positive weights are
    /// configuration bugs and are rejected.
    pub fn register(&mut self, spec: ModelSpec) -> Result<()> {
        if spec.id.trim().is_empty() {
            anyhow::bail!("Model identifier must not be empty");
        }
        if !spec.weight.is_finite() || spec.weight <= 0.0 {
            anyhow::bail!(
                "Model '{}' has invalid weight {} (must be positive and finite)",
                spec.id,
                spec.weight
            );
        }
        if self.get(&spec.id).is_some() {
            anyhow::bail!("Model '{}' is registered twice", spec.id);
        }

        self.entries.push(RegistryEntry {
            spec,
            availability: Availability::Unchecked,
        });
        Ok(())
    }

    /// Check every scorer's command and record its availability.
    ///
    /// Never fails: a missing or non-executable scorer is recorded as
    /// unavailable with a reason. Returns the number of available models.
    pub fn validate(&mut self) -> usize {
        for entry in &mut self.entries {
            entry.availability = match check_command(&entry.spec.command) {
                Ok(()) => Availability::Available,
                Err(reason) => {
                    warn!(model = entry.spec.id, reason, "Model unavailable");
                    Availability::Unavailable { reason }
                }
            };
        }

        let available = self.active_specs().count();
        info!(
            available,
            total = self.entries.len(),
            "Model registry validated"
        );
        available
    }

    /// Specs not marked unavailable, in registration order.
    pub fn active_specs(&self) -> impl Iterator<Item = &ModelSpec> {
        self.entries
            .iter()
            .filter(|e| !e.availability.is_unavailable())
            .map(|e| &e.spec)
    }

    /// All specs paired with their availability, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&ModelSpec, &Availability)> {
        self.entries.iter().map(|e| (&e.spec, &e.availability))
    }

    pub fn get(&self, id: &str) -> Option<&ModelSpec> {
        self.entries
            .iter()
            .find(|e| e.spec.id == id)
            .map(|e| &e.spec)
    }

    pub fn availability(&self, id: &str) -> Option<&Availability> {
        self.entries
            .iter()
            .find(|e| e.spec.id == id)
            .map(|e| &e.availability)
    }

    /// Model identifier → weight, for composite and risk-factor computation.
    pub fn weights(&self) -> HashMap<String, f64> {
        self.entries
            .iter()
            .map(|e| (e.spec.id.clone(), e.spec.weight))
            .collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.spec.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check that a scorer command can be launched, without launching it.
fn check_command(command: &ScorerCommand) -> std::result::Result<(), String> {
    if !command.script.is_file() {
        return Err(format!("script not found: {}", command.script.display()));
    }

    match &command.interpreter {
        Some(interpreter) => {
            if resolve_program(interpreter).is_none() {
                return Err(format!("interpreter not found: {}", interpreter.display()));
            }
        }
        None => {
            if !is_executable(&command.script) {
                return Err(format!(
                    "script is not executable: {}",
                    command.script.display()
                ));
            }
        }
    }

    Ok(())
}

/// Resolve a program the way a shell would: paths are used as-is, bare
/// names are searched for on PATH.
fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return is_executable(program).then(|| program.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    let mut seen = HashSet::new();
    std::env::split_paths(&path_var)
        .filter(|dir| seen.insert(dir.clone()))
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
