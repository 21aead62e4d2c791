//! Configuration loading, validation, and management for ArenaGuard.
//!
//! Loads configuration from `~/.arenaguard/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use arenaguard_core::browser::{ContextOptions, Viewport};
use arenaguard_core::tool::ToolName;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.arenaguard/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port of the service's own API. Agents may call `localhost` on this
    /// port and nothing else on loopback.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Session runner tunables
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Tool validation and throttling
    #[serde(default)]
    pub security: SecurityConfig,

    /// Per-session spend ceiling
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Outbound `api_call` tool settings
    #[serde(default)]
    pub api_call: ApiCallConfig,

    /// Event transport settings
    #[serde(default)]
    pub events: EventsConfig,

    /// Webhook turn producer settings
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Custom per-1K-token rates, matched before the built-in table
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pricing: Vec<PricingOverrideConfig>,
}

fn default_api_port() -> u16 {
    3003
}

/// Session runner tunables. Supplied once, immutable for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Upper bound on a single producer call
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,

    /// Calls beyond this count in one turn are dropped
    #[serde(default = "default_max_tool_calls_per_turn")]
    pub max_tool_calls_per_turn: usize,

    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    #[serde(default)]
    pub record_video: bool,

    #[serde(default = "default_true")]
    pub headless: bool,
}

fn default_viewport_width() -> u32 {
    1280
}
fn default_viewport_height() -> u32 {
    720
}
fn default_max_turns() -> u32 {
    50
}
fn default_turn_timeout_secs() -> u64 {
    60
}
fn default_max_tool_calls_per_turn() -> usize {
    5
}
fn default_navigation_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            max_turns: default_max_turns(),
            turn_timeout_secs: default_turn_timeout_secs(),
            max_tool_calls_per_turn: default_max_tool_calls_per_turn(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            record_video: false,
            headless: true,
        }
    }
}

impl RunnerConfig {
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            viewport: Viewport {
                width: self.viewport_width,
                height: self.viewport_height,
            },
            headless: self.headless,
            record_video: self.record_video,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Longest string accepted in any tool argument (characters)
    #[serde(default = "default_max_argument_length")]
    pub max_argument_length: usize,

    /// Ceiling for the 1-second rate window
    #[serde(default = "default_max_actions_per_second")]
    pub max_actions_per_second: usize,

    /// Longest explicit `wait` an agent may request
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Tools the executor will run. May narrow the vocabulary, never widen it.
    #[serde(default = "default_allowed_tools")]
    pub allowed_tools: Vec<String>,
}

fn default_max_argument_length() -> usize {
    10_000
}
fn default_max_actions_per_second() -> usize {
    3
}
fn default_max_wait_ms() -> u64 {
    10_000
}
fn default_allowed_tools() -> Vec<String> {
    ToolName::ALL.iter().map(|t| t.as_str().to_string()).collect()
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_argument_length: default_max_argument_length(),
            max_actions_per_second: default_max_actions_per_second(),
            max_wait_ms: default_max_wait_ms(),
            allowed_tools: default_allowed_tools(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Hard stop, in USD, for one session
    #[serde(default = "default_max_cost_usd")]
    pub max_cost_usd: f64,

    /// Fraction of the budget at which a warning is logged
    #[serde(default = "default_warn_ratio")]
    pub warn_ratio: f64,
}

fn default_max_cost_usd() -> f64 {
    5.0
}
fn default_warn_ratio() -> f64 {
    0.8
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_cost_usd: default_max_cost_usd(),
            warn_ratio: default_warn_ratio(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCallConfig {
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,

    /// Response bodies are truncated to this many bytes before being
    /// returned to the producer
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

fn default_api_timeout_secs() -> u64 {
    15
}
fn default_max_response_bytes() -> usize {
    65_536
}

impl Default for ApiCallConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_api_timeout_secs(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Shared secret for request signing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Cap on an agent response body; larger bodies fail the turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_bytes: Option<usize>,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url)
            .field("secret", &redact(&self.secret))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

/// A custom rate for model ids containing `pattern`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOverrideConfig {
    pub pattern: String,
    /// Price per 1K input tokens in USD
    pub input_per_1k: f64,
    /// Price per 1K output tokens in USD
    pub output_per_1k: f64,
}

impl AppConfig {
    /// Load configuration from the default path (~/.arenaguard/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `ARENAGUARD_API_PORT`
    /// - `ARENAGUARD_MAX_TURNS`
    /// - `ARENAGUARD_BUDGET_USD`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("ARENAGUARD_API_PORT") {
            self.api_port = parse_env("ARENAGUARD_API_PORT", &port)?;
        }
        if let Some(turns) = lookup("ARENAGUARD_MAX_TURNS") {
            self.runner.max_turns = parse_env("ARENAGUARD_MAX_TURNS", &turns)?;
        }
        if let Some(budget) = lookup("ARENAGUARD_BUDGET_USD") {
            self.budget.max_cost_usd = parse_env("ARENAGUARD_BUDGET_USD", &budget)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".arenaguard")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.max_turns == 0 {
            return Err(ConfigError::ValidationError("runner.max_turns must be > 0".into()));
        }
        if self.runner.turn_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "runner.turn_timeout_secs must be > 0".into(),
            ));
        }
        if self.security.max_actions_per_second == 0 {
            return Err(ConfigError::ValidationError(
                "security.max_actions_per_second must be > 0".into(),
            ));
        }
        if self.security.max_argument_length == 0 {
            return Err(ConfigError::ValidationError(
                "security.max_argument_length must be > 0".into(),
            ));
        }
        if !(self.budget.max_cost_usd > 0.0) {
            return Err(ConfigError::ValidationError(
                "budget.max_cost_usd must be positive".into(),
            ));
        }
        if !(self.budget.warn_ratio > 0.0 && self.budget.warn_ratio <= 1.0) {
            return Err(ConfigError::ValidationError(
                "budget.warn_ratio must be in (0, 1]".into(),
            ));
        }
        if self.webhook.max_response_bytes == Some(0) {
            return Err(ConfigError::ValidationError(
                "webhook.max_response_bytes must be > 0".into(),
            ));
        }
        if let Some(unknown) = self
            .security
            .allowed_tools
            .iter()
            .find(|t| ToolName::from_name(t).is_none())
        {
            return Err(ConfigError::ValidationError(format!(
                "security.allowed_tools contains unknown tool '{unknown}'"
            )));
        }
        if let Some(bad) = self
            .pricing
            .iter()
            .find(|p| p.pattern.is_empty() || p.input_per_1k < 0.0 || p.output_per_1k < 0.0)
        {
            return Err(ConfigError::ValidationError(format!(
                "pricing override '{}' must have a pattern and non-negative rates",
                bad.pattern
            )));
        }
        Ok(())
    }

    /// Resolved allowlist.
    pub fn allowed_tools(&self) -> Vec<ToolName> {
        self.security
            .allowed_tools
            .iter()
            .filter_map(|t| ToolName::from_name(t))
            .collect()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            runner: RunnerConfig::default(),
            security: SecurityConfig::default(),
            budget: BudgetConfig::default(),
            api_call: ApiCallConfig::default(),
            events: EventsConfig::default(),
            webhook: WebhookConfig::default(),
            pricing: vec![],
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has invalid value '{value}'")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
