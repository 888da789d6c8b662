use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::pipeline::aggregate::DEFAULT_CONCURRENCY;
use crate::registry::{standard, ModelRegistry};
use crate::scorer::subprocess::DEFAULT_TIMEOUT;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy, so every
/// field can be set there instead of in the shell.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one subdirectory per standard detector.
    pub models_dir: PathBuf,
    /// Interpreter for detector scripts. `None` runs the scripts directly.
    pub python: Option<PathBuf>,
    /// JSON registry file replacing the standard ten detectors.
    pub registry_path: Option<PathBuf>,
    /// Per-model time budget.
    pub timeout: Duration,
    /// How many detectors run at once within one analysis.
    pub concurrency: usize,
    pub db_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default. Numeric variables that are set but don't
    /// parse are reported rather than silently replaced.
    pub fn load() -> Result<Self> {
        let python = match env::var("CONCORDANCE_PYTHON") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(PathBuf::from(value)),
            Err(_) => Some(PathBuf::from("python3")),
        };

        let timeout = match env::var("CONCORDANCE_TIMEOUT_SECS") {
            Ok(value) => {
                let secs: u64 = value.trim().parse().with_context(|| {
                    format!("CONCORDANCE_TIMEOUT_SECS must be a whole number of seconds, got '{value}'")
                })?;
                if secs == 0 {
                    anyhow::bail!("CONCORDANCE_TIMEOUT_SECS must be at least 1");
                }
                Duration::from_secs(secs)
            }
            Err(_) => DEFAULT_TIMEOUT,
        };

        let concurrency = match env::var("CONCORDANCE_CONCURRENCY") {
            Ok(value) => {
                let n: usize = value.trim().parse().with_context(|| {
                    format!("CONCORDANCE_CONCURRENCY must be a positive integer, got '{value}'")
                })?;
                if n == 0 {
                    anyhow::bail!("CONCORDANCE_CONCURRENCY must be at least 1");
                }
                n
            }
            Err(_) => DEFAULT_CONCURRENCY,
        };

        Ok(Self {
            models_dir: env::var("CONCORDANCE_MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("..")),
            python,
            registry_path: env::var("CONCORDANCE_REGISTRY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            timeout,
            concurrency,
            db_path: env::var("CONCORDANCE_DB_PATH")
                .unwrap_or_else(|_| "./concordance.db".to_string()),
        })
    }

    /// Build the detector registry: the JSON file when one is configured,
    /// otherwise the standard ten under `models_dir`. Not yet validated.
    pub fn build_registry(&self) -> Result<ModelRegistry> {
        match &self.registry_path {
            Some(path) => ModelRegistry::from_json_file(path),
            None => standard::standard_registry(&self.models_dir, self.python.as_deref()),
        }
    }

    /// Check that the models directory exists.
    /// Call this before running the standard registry.
    pub fn require_models_dir(&self) -> Result<()> {
        if self.registry_path.is_none() && !self.models_dir.is_dir() {
            anyhow::bail!(
                "Models directory not found: {}\n\
                 Set CONCORDANCE_MODELS_DIR in your .env file to the directory \
                 containing the detector folders.",
                self.models_dir.display()
            );
        }
        Ok(())
    }

    /// Check that the configured registry file exists, if one is set.
    pub fn require_registry_file(&self) -> Result<()> {
        if let Some(path) = &self.registry_path {
            if !path.is_file() {
                anyhow::bail!(
                    "CONCORDANCE_REGISTRY points to {}, which does not exist.",
                    path.display()
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config() -> Config {
        Config {
            models_dir: PathBuf::from("/nonexistent/models"),
            python: Some(PathBuf::from("python3")),
            registry_path: None,
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            db_path: ":memory:".to_string(),
        }
    }

    #[test]
    fn test_standard_registry_when_no_file() {
        let registry = config().build_registry().unwrap();
        assert_eq!(registry.len(), 10);
        let spec = registry.get("reply_bait").unwrap();
        assert!(spec.command.script.starts_with(Path::new("/nonexistent/models")));
    }

    #[test]
    fn test_require_models_dir() {
        assert!(config().require_models_dir().is_err());

        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config();
        cfg.models_dir = dir.path().to_path_buf();
        assert!(cfg.require_models_dir().is_ok());
    }

    #[test]
    fn test_registry_file_overrides_standard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(
            &path,
            r#"[{"id": "only", "weight": 1.0,
                 "command": {"script": "/bin/true"}, "score_key": "only_score"}]"#,
        )
        .unwrap();

        let mut cfg = config();
        cfg.registry_path = Some(path);
        cfg.require_registry_file().unwrap();
        // The models dir is irrelevant once a registry file is set.
        cfg.require_models_dir().unwrap();

        let registry = cfg.build_registry().unwrap();
        assert_eq!(registry.ids(), vec!["only"]);
    }

    #[test]
    fn test_missing_registry_file() {
        let mut cfg = config();
        cfg.registry_path = Some(PathBuf::from("/nonexistent/registry.json"));
        assert!(cfg.require_registry_file().is_err());
        assert!(cfg.build_registry().is_err());
    }
}
