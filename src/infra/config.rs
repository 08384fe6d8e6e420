// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level runner configuration.
///
/// Loaded once at startup and threaded into every component as an immutable
/// value. Components never read process-wide state themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub scenario: ScenarioConfig,

    #[serde(default)]
    pub refine: RefineConfig,

    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    #[serde(default)]
    pub oracle: OracleConfig,
}

/// Execution environment the workspace runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvKind {
    Docker,
    Local,
}

/// Read-only scenario settings consumed by evaluators and the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub env_kind: EnvKind,
    /// Overall wall-clock budget for one pipeline execution, in seconds.
    pub max_seconds: u64,
    /// When true, a second evaluator checks persisted model artifacts.
    pub enable_model_dump: bool,
    /// When true, finalization requires the submission-format check output.
    pub check_format: bool,
    /// Command that runs the pipeline inside the workspace.
    pub entrypoint: String,
    /// Image used when `env_kind = "docker"`.
    pub docker_image: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            env_kind: EnvKind::Docker,
            max_seconds: 3600,
            enable_model_dump: false,
            check_format: false,
            entrypoint: "python main.py".into(),
            docker_image: "python:3.11-slim".into(),
        }
    }
}

/// Refinement loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Ask the oracle for unified diffs instead of full-file rewrites.
    pub diff_mode: bool,
    /// Maximum refine-evaluate iterations per run.
    pub max_loop: usize,
    /// Attempts for one refinement step before its failure is fatal.
    pub retry_attempts: usize,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            diff_mode: false,
            max_loop: 3,
            retry_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Fan evaluators out concurrently. Merge order stays fixed either way.
    pub parallel: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self { parallel: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Base URL of an OpenAI-compatible endpoint.
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_seconds: 300,
        }
    }
}

impl RunnerConfig {
    /// Load config from `pipefix.toml` in the current directory, falling back
    /// to defaults when the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("pipefix.toml");
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RunnerConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = RunnerConfig::default();
        assert_eq!(c.scenario.env_kind, EnvKind::Docker);
        assert_eq!(c.scenario.max_seconds, 3600);
        assert!(!c.scenario.enable_model_dump);
        assert!(!c.scenario.check_format);
        assert_eq!(c.refine.max_loop, 3);
        assert_eq!(c.refine.retry_attempts, 5);
        assert!(!c.refine.diff_mode);
        assert!(!c.evaluator.parallel);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: RunnerConfig = toml::from_str("").unwrap();
        assert_eq!(config.refine.max_loop, 3);
        assert_eq!(config.oracle.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_partial_section_fills_missing_fields() {
        let config: RunnerConfig = toml::from_str("[refine]\nmax_loop = 5\n").unwrap();
        assert_eq!(config.refine.max_loop, 5);
        assert_eq!(config.refine.retry_attempts, 5);
        assert!(!config.refine.diff_mode);

        let config: RunnerConfig = toml::from_str("[scenario]\nenv_kind = \"local\"\n").unwrap();
        assert_eq!(config.scenario.env_kind, EnvKind::Local);
        assert_eq!(config.scenario.max_seconds, 3600);
        assert_eq!(config.scenario.entrypoint, "python main.py");

        let config: RunnerConfig = toml::from_str("[oracle]\nmodel = \"o3\"\n").unwrap();
        assert_eq!(config.oracle.model, "o3");
        assert_eq!(config.oracle.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[scenario]
env_kind = "local"
max_seconds = 600
enable_model_dump = true
check_format = true
entrypoint = "python run.py"
docker_image = "custom:latest"

[refine]
diff_mode = true
max_loop = 5
retry_attempts = 3

[evaluator]
parallel = true

[oracle]
base_url = "http://localhost:8000/v1"
model = "local-model"
api_key_env = "LOCAL_KEY"
timeout_seconds = 60
"#;
        let config: RunnerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scenario.env_kind, EnvKind::Local);
        assert_eq!(config.scenario.max_seconds, 600);
        assert!(config.scenario.enable_model_dump);
        assert!(config.scenario.check_format);
        assert_eq!(config.scenario.entrypoint, "python run.py");
        assert!(config.refine.diff_mode);
        assert_eq!(config.refine.max_loop, 5);
        assert_eq!(config.refine.retry_attempts, 3);
        assert!(config.evaluator.parallel);
        assert_eq!(config.oracle.model, "local-model");
        assert_eq!(config.oracle.timeout_seconds, 60);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = RunnerConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: RunnerConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.refine.max_loop, config.refine.max_loop);
        assert_eq!(deserialized.scenario.env_kind, config.scenario.env_kind);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = RunnerConfig::load_from(Path::new("/nonexistent/pipefix.toml"));
        assert!(result.is_err());
    }
}
