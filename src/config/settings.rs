//! Configuration settings for the agent.

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default scoring service the questions and attachments come from.
pub const DEFAULT_API_BASE_URL: &str = "https://agents-course-unit4-scoring.hf.space";

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Longest wait allowed between model call attempts.
const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub api: ApiSettings,
    pub model: ModelSettings,
    pub agent: AgentSettings,
    pub retry: RetrySettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for fetched questions and attachments.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Scoring service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the question/file service.
    pub base_url: String,
    /// Timeout for `GET /questions` in seconds.
    pub questions_timeout_secs: u64,
    /// Timeout for `GET /files/{task_id}` in seconds.
    pub files_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            questions_timeout_secs: 15,
            files_timeout_secs: 30,
        }
    }
}

/// Model collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Gemini API key. Usually supplied through `GEMINI_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model variant to call.
    pub name: String,
    /// Gemini REST endpoint.
    pub endpoint: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum output tokens per answer.
    pub max_output_tokens: u32,
    /// Thinking budget in tokens (-1 lets the model decide).
    pub thinking_budget: i32,
    /// Ask the model to return its thought summaries.
    pub include_thoughts: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            name: "gemini-2.5-flash".to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            temperature: 0.1,
            max_output_tokens: 4096,
            thinking_budget: -1,
            include_thoughts: true,
            timeout_secs: 300,
        }
    }
}

/// Execution guards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum agent-tool iterations. The linear pipeline does not loop, so this is
    /// carried for configuration compatibility only.
    pub max_iterations: usize,
    /// Maximum number of pipeline steps per question.
    pub recursion_limit: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 6,
            recursion_limit: 25,
        }
    }
}

/// Retry policy for the model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub multiplier_secs: f64,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier_secs: 1.0,
            min_delay_secs: 1.0,
            max_delay_secs: 10.0,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file, then apply the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment variables override file values.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Apply environment-style overrides using the given lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GEMINI_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(url) = get("API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.model.name = model;
        }
        if let Some(v) = get("TEMPERATURE") {
            self.model.temperature = parse_env("TEMPERATURE", &v)?;
        }
        if let Some(v) = get("MAX_OUTPUT_TOKENS") {
            self.model.max_output_tokens = parse_env("MAX_OUTPUT_TOKENS", &v)?;
        }
        if let Some(v) = get("MAX_ITERATIONS") {
            self.agent.max_iterations = parse_env("MAX_ITERATIONS", &v)?;
        }
        if let Some(v) = get("RECURSION_LIMIT") {
            self.agent.recursion_limit = parse_env("RECURSION_LIMIT", &v)?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.general.log_level = level.to_lowercase();
        }

        Ok(())
    }

    /// Check that everything needed to answer questions is present and sane.
    pub fn validate(&self) -> Result<()> {
        match self.model.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => {
                return Err(AgentError::Validation(
                    "GEMINI_API_KEY is required but not set".to_string(),
                ))
            }
        }

        url::Url::parse(&self.api.base_url).map_err(|e| {
            AgentError::Validation(format!("api.base_url {:?}: {}", self.api.base_url, e))
        })?;
        url::Url::parse(&self.model.endpoint).map_err(|e| {
            AgentError::Validation(format!("model.endpoint {:?}: {}", self.model.endpoint, e))
        })?;

        if self.model.name.trim().is_empty() {
            return Err(AgentError::Validation("model.name is empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(AgentError::Validation(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.model.temperature
            )));
        }
        if self.model.max_output_tokens == 0 {
            return Err(AgentError::Validation(
                "max_output_tokens must be positive".to_string(),
            ));
        }
        if self.agent.recursion_limit == 0 {
            return Err(AgentError::Validation(
                "recursion_limit must be positive".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(AgentError::Validation(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        for (key, secs) in [
            ("retry.multiplier_secs", self.retry.multiplier_secs),
            ("retry.min_delay_secs", self.retry.min_delay_secs),
            ("retry.max_delay_secs", self.retry.max_delay_secs),
        ] {
            if !secs.is_finite() || !(0.0..=MAX_RETRY_DELAY_SECS).contains(&secs) {
                return Err(AgentError::Validation(format!(
                    "{} must be within 0..={} seconds, got {}",
                    key, MAX_RETRY_DELAY_SECS, secs
                )));
            }
        }
        if self.retry.min_delay_secs > self.retry.max_delay_secs {
            return Err(AgentError::Validation(format!(
                "retry.min_delay_secs ({}) exceeds retry.max_delay_secs ({})",
                self.retry.min_delay_secs, self.retry.max_delay_secs
            )));
        }

        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AgentError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gaia-agent")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Path of the staged questions file.
    pub fn questions_path(&self) -> PathBuf {
        self.data_dir().join("questions.json")
    }

    /// Model request timeout.
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model.timeout_secs)
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AgentError::Validation(format!("{}={:?}: {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.model.name, "gemini-2.5-flash");
        assert!((settings.model.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(settings.model.max_output_tokens, 4096);
        assert_eq!(settings.agent.max_iterations, 6);
        assert_eq!(settings.agent.recursion_limit, 25);
        assert_eq!(settings.general.log_level, "info");
        assert_eq!(settings.retry.max_attempts, 3);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(lookup(&[
                ("GEMINI_API_KEY", "secret"),
                ("GEMINI_MODEL", "gemini-2.5-pro"),
                ("TEMPERATURE", "0.7"),
                ("MAX_OUTPUT_TOKENS", "1024"),
                ("RECURSION_LIMIT", "10"),
                ("LOG_LEVEL", "DEBUG"),
            ]))
            .unwrap();

        assert_eq!(settings.model.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.model.name, "gemini-2.5-pro");
        assert!((settings.model.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(settings.model.max_output_tokens, 1024);
        assert_eq!(settings.agent.recursion_limit, 10);
        assert_eq!(settings.general.log_level, "debug");
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(lookup(&[("MAX_OUTPUT_TOKENS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[test]
    fn test_validate_requires_api_key() {
        let settings = Settings::default();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let mut settings = Settings::default();
        settings.model.api_key = Some("key".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unusable_retry_delays() {
        let mut settings: Settings = toml::from_str("[retry]\nmax_delay_secs = 1e20\n").unwrap();
        settings.model.api_key = Some("key".to_string());
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
        assert!(err.to_string().contains("retry.max_delay_secs"));

        settings.retry.max_delay_secs = f64::INFINITY;
        assert!(matches!(settings.validate(), Err(AgentError::Validation(_))));

        settings.retry.max_delay_secs = 10.0;
        settings.retry.min_delay_secs = -1.0;
        assert!(matches!(settings.validate(), Err(AgentError::Validation(_))));

        settings.retry.min_delay_secs = 20.0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds"));

        settings.retry.min_delay_secs = 1.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut settings = Settings::default();
        settings.model.api_key = Some("key".to_string());
        settings.api.base_url = "not a url".to_string();
        assert!(matches!(settings.validate(), Err(AgentError::Validation(_))));
    }

    #[test]
    fn test_file_values_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[model]\nname = \"from-file\"\ntemperature = 0.3\n\n[agent]\nrecursion_limit = 7\n",
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut settings: Settings = toml::from_str(&content).unwrap();
        assert_eq!(settings.model.name, "from-file");
        assert_eq!(settings.agent.recursion_limit, 7);
        // Untouched sections keep their defaults
        assert_eq!(settings.api.base_url, DEFAULT_API_BASE_URL);

        settings
            .apply_overrides(lookup(&[("GEMINI_MODEL", "from-env")]))
            .unwrap();
        assert_eq!(settings.model.name, "from-env");
        assert!((settings.model.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_save_round_trip_omits_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Settings::default().save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("api_key"));
        let loaded: Settings = toml::from_str(&content).unwrap();
        assert_eq!(loaded.model.name, "gemini-2.5-flash");
    }
}
