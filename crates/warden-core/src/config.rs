use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WardenError;

/// Top-level configuration loaded from `.warden.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use warden_core::WardenConfig;
///
/// let config = WardenConfig::default();
/// assert_eq!(config.gate.termination_timeout_secs, 30);
/// assert!(config.enhancement.enabled);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Comment enhancement settings.
    #[serde(default)]
    pub enhancement: EnhancementConfig,
    /// Eligibility gate settings.
    #[serde(default)]
    pub gate: GateConfig,
    /// GitHub API access.
    #[serde(default)]
    pub github: GitHubConfig,
}

impl WardenConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::FileNotFound`] if the file does not exist,
    /// [`WardenError::Io`] if it cannot be read, or [`WardenError::Toml`] if
    /// the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use warden_core::WardenConfig;
    /// use std::path::Path;
    ///
    /// let config = WardenConfig::from_file(Path::new(".warden.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, WardenError> {
        if !path.exists() {
            return Err(WardenError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_core::WardenConfig;
    ///
    /// let toml = r#"
    /// [gate]
    /// termination_timeout_secs = 10
    /// "#;
    /// let config = WardenConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.gate.termination_timeout_secs, 10);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, WardenError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Fill unset secrets from the environment.
    ///
    /// `OPENAI_API_KEY` backs `llm.api_key`; `GITHUB_TOKEN` (then `GH_TOKEN`)
    /// backs `github.token`. Values already present in the file win.
    pub fn apply_env(&mut self) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if self.github.token.is_none() {
            self.github.token = std::env::var("GITHUB_TOKEN")
                .or_else(|_| std::env::var("GH_TOKEN"))
                .ok();
        }
    }
}

/// LLM provider configuration.
///
/// # Examples
///
/// ```
/// use warden_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o");
/// assert_eq!(config.timeout_secs, 120);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name (`"openai"`, `"ollama"`, `"openrouter"`); picks the
    /// default API root when `base_url` is unset.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests. Required for unknown providers.
    pub base_url: Option<String>,
    /// HTTP client timeout in seconds.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".into()
}

fn default_model() -> String {
    "gpt-4o".into()
}

fn default_llm_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Comment enhancement pipeline configuration.
///
/// # Examples
///
/// ```
/// use warden_core::EnhancementConfig;
/// use std::time::Duration;
///
/// let config = EnhancementConfig::default();
/// assert_eq!(config.timeout(), Duration::from_secs(120));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementConfig {
    /// Run the validation pass at all (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Deadline for the batched AI call, in seconds (default: 120).
    #[serde(default = "default_enhancement_timeout_secs")]
    pub timeout_secs: u64,
    /// Free-text context forwarded in the request payload.
    #[serde(default)]
    pub context: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_enhancement_timeout_secs() -> u64 {
    120
}

impl EnhancementConfig {
    /// The pipeline deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_enhancement_timeout_secs(),
            context: None,
        }
    }
}

/// Eligibility gate configuration.
///
/// # Examples
///
/// ```
/// use warden_core::GateConfig;
///
/// let config = GateConfig::default();
/// assert_eq!(config.check_run_names, vec!["AI Code Review".to_string()]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Upper bound on the detached stale check-run termination (default: 30).
    #[serde(default = "default_termination_timeout_secs")]
    pub termination_timeout_secs: u64,
    /// Check-run names that belong to the AI reviewer.
    #[serde(default = "default_check_run_names")]
    pub check_run_names: Vec<String>,
}

fn default_termination_timeout_secs() -> u64 {
    30
}

fn default_check_run_names() -> Vec<String> {
    vec!["AI Code Review".into()]
}

impl GateConfig {
    /// The termination deadline as a [`Duration`].
    pub fn termination_timeout(&self) -> Duration {
        Duration::from_secs(self.termination_timeout_secs)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            termination_timeout_secs: default_termination_timeout_secs(),
            check_run_names: default_check_run_names(),
        }
    }
}

/// GitHub API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Token used for API calls.
    pub token: Option<String>,
    /// API root (default: `https://api.github.com`).
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_api_url(),
        }
    }
}
