use config::{Config, File};
use serde::{Deserialize, Serialize};

pub mod validator;

use crate::cli::Cli;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub resy: ResySettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// LLM decision-provider settings. The API key itself is only ever read
/// from the environment variable named here.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmSettings {
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable containing the API key (default: OPENAI_API_KEY)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Custom base URL (for self-hosted or proxied OpenAI-compatible endpoints)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> Option<f32> {
    Some(0.7)
}

fn default_max_tokens() -> Option<u32> {
    Some(1000)
}

fn default_llm_timeout() -> u64 {
    60
}

/// Venue vector-index service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchSettings {
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    /// Collection to query on the index service
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            collection: default_collection(),
            timeout_seconds: default_upstream_timeout(),
        }
    }
}

fn default_search_base_url() -> String {
    "http://127.0.0.1:8100".to_string()
}

fn default_collection() -> String {
    "venues".to_string()
}

fn default_upstream_timeout() -> u64 {
    10
}

/// Reservation-provider API settings. Credentials are read from the
/// environment variables named here at client construction time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResySettings {
    #[serde(default = "default_resy_base_url")]
    pub base_url: String,
    #[serde(default = "default_resy_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_resy_auth_token_env")]
    pub auth_token_env: String,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ResySettings {
    fn default() -> Self {
        Self {
            base_url: default_resy_base_url(),
            api_key_env: default_resy_api_key_env(),
            auth_token_env: default_resy_auth_token_env(),
            timeout_seconds: default_upstream_timeout(),
        }
    }
}

fn default_resy_base_url() -> String {
    "https://api.resy.com".to_string()
}

fn default_resy_api_key_env() -> String {
    "RESY_API_KEY".to_string()
}

fn default_resy_auth_token_env() -> String {
    "X_RESY_AUTH_TOKEN".to_string()
}

/// Orchestration-loop settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentSettings {
    /// System prompt template. Rendered with `today` and, when the session
    /// already knows venues, a `context` block listing them.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Hard ceiling on decision rounds per user message
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// How many prior conversation turns are replayed to the model
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Result-cache time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// List entries kept when a result payload is truncated
    #[serde(default = "default_truncate_keep")]
    pub truncate_keep: usize,
    /// Serialized-result size above which truncation kicks in
    #[serde(default = "default_truncate_byte_budget")]
    pub truncate_byte_budget: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_iterations: default_max_iterations(),
            history_window: default_history_window(),
            cache_ttl_seconds: default_cache_ttl(),
            truncate_keep: default_truncate_keep(),
            truncate_byte_budget: default_truncate_byte_budget(),
        }
    }
}

fn default_max_iterations() -> u32 {
    5
}

fn default_history_window() -> usize {
    10
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_truncate_keep() -> usize {
    3
}

fn default_truncate_byte_budget() -> usize {
    4096
}

fn default_system_prompt() -> String {
    r#"You are a helpful restaurant reservation assistant. You can help users:
1. Search for restaurants based on cuisine, location, occasion, etc.
2. Check availability for specific venues
3. Get available time slots for booking
4. View their current reservations

Call at most one function at a time and wait for its result before deciding on the next step. Today's date is {{ today }}.

Always be helpful and provide clear, actionable information. When showing restaurant options, include key details like name, type, neighborhood, and rating. When showing availability, present dates and times in a user-friendly format.

If a user asks about booking, explain that you can show available time slots and booking tokens, but the actual booking needs to be completed through the restaurant or its reservation provider.
{% if context %}
You already identified these venues earlier in the conversation. Reuse their venue ids instead of searching again:
{{ context }}
{% endif %}"#
        .to_string()
}

impl Settings {
    /// Load settings from the config file (optional) with CLI overrides
    /// applied on top, then validate.
    pub fn new(cli: &Cli) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(cli.config.clone()).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;
        settings.apply_cli_overrides(cli);

        validator::ConfigValidator::validate(&settings).map_err(|errors| {
            anyhow::anyhow!("Configuration validation failed:\n{}", errors.join("\n"))
        })?;

        Ok(settings)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
    }
}
