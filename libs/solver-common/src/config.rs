// Runtime configuration for the solver.
//
// Built once at process startup and passed by reference into the runner,
// the generator, and the store. There are no process-wide singletons; two
// configs in the same process never observe each other.

use std::path::PathBuf;
use std::time::Duration;

/// Per-case execution deadline applied when nothing else is configured.
pub const DEFAULT_CASE_TIMEOUT_SECS: u64 = 6;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_RUNS_DIR: &str = "runs";

#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Interpreter used to run harness artifacts.
    pub python_bin: String,
    /// Hard wall-clock deadline per test case.
    pub case_timeout: Duration,
    /// Directory the run store writes `run_<id>.json` files into.
    pub runs_dir: PathBuf,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    /// Optional file overriding the built-in system prompt.
    pub prompt_template: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            python_bin: "python3".to_string(),
            case_timeout: Duration::from_secs(DEFAULT_CASE_TIMEOUT_SECS),
            runs_dir: PathBuf::from(DEFAULT_RUNS_DIR),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            max_tokens: 1200,
            request_timeout: Duration::from_secs(60),
            prompt_template: None,
        }
    }
}

impl SolverConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(bin) = std::env::var("SOLVER_PYTHON_BIN") {
            config.python_bin = bin;
        }
        if let Some(secs) = env_u64("SOLVER_CASE_TIMEOUT_SECS") {
            config.case_timeout = Duration::from_secs(secs);
        }
        if let Ok(dir) = std::env::var("SOLVER_RUNS_DIR") {
            config.runs_dir = PathBuf::from(dir);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.generator.api_key = key;
        }
        if let Ok(model) = std::env::var("SOLVER_MODEL") {
            config.generator.model = model;
        }
        if let Ok(url) = std::env::var("SOLVER_BASE_URL") {
            config.generator.base_url = url;
        }
        if let Ok(path) = std::env::var("SOLVER_PROMPT_TEMPLATE") {
            config.generator.prompt_template = Some(PathBuf::from(path));
        }

        config
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.python_bin, "python3");
        assert_eq!(config.case_timeout, Duration::from_secs(6));
        assert_eq!(config.generator.model, DEFAULT_MODEL);
        assert_eq!(config.generator.temperature, 0.0);
        assert_eq!(config.generator.max_tokens, 1200);
    }
}
