//! Environment-backed configuration.
//!
//! Every binary calls `dotenvy::dotenv().ok()` before reading these, so a
//! local `.env` file works the same as real environment variables.

/// Default HTTP port for the API server and the dispatch relay target.
pub const DEFAULT_API_PORT: u16 = 12530;

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database URL (e.g., "sqlite:jobrelay.db?mode=rwc").
    pub database_url: String,
    /// Base URL of the dispatch endpoint tool calls are relayed to.
    pub dispatch_base_url: String,
    /// LLM provider configuration.
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:jobrelay.db?mode=rwc".to_string(),
            dispatch_base_url: format!("http://127.0.0.1:{}", DEFAULT_API_PORT),
            llm: LlmConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `DATABASE_URL` (e.g. "sqlite:jobrelay.db?mode=rwc")
    /// - `DISPATCH_BASE_URL` (e.g. "http://127.0.0.1:12530")
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(database_url) = std::env::var("DATABASE_URL")
            && !database_url.trim().is_empty()
        {
            config.database_url = database_url;
        }

        if let Ok(dispatch_base_url) = std::env::var("DISPATCH_BASE_URL")
            && !dispatch_base_url.trim().is_empty()
        {
            config.dispatch_base_url = dispatch_base_url;
        }

        config.llm = LlmConfig::from_env_or_default();

        config
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key; required before the agent bridge can serve prompts.
    pub api_key: Option<String>,
    /// API base URL (overridable for testing).
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 1024,
        }
    }
}

impl LlmConfig {
    /// Load LLM config from environment variables, falling back to defaults.
    ///
    /// Supported env vars: `ANTHROPIC_API_KEY`, `ANTHROPIC_BASE_URL`,
    /// `ANTHROPIC_MODEL`, `ANTHROPIC_MAX_TOKENS`.
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY")
            && !api_key.trim().is_empty()
        {
            config.api_key = Some(api_key);
        }

        if let Ok(base_url) = std::env::var("ANTHROPIC_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url;
        }

        if let Ok(model) = std::env::var("ANTHROPIC_MODEL")
            && !model.trim().is_empty()
        {
            config.model = model;
        }

        if let Ok(max_tokens) = std::env::var("ANTHROPIC_MAX_TOKENS")
            && let Ok(parsed) = max_tokens.parse::<u32>()
        {
            config.max_tokens = parsed;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database_url, "sqlite:jobrelay.db?mode=rwc");
        assert!(config.dispatch_base_url.ends_with(":12530"));
    }

    #[test]
    fn test_llm_config_defaults() {
        let config = LlmConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.base_url, "https://api.anthropic.com");
        assert_eq!(config.max_tokens, 1024);
    }
}
