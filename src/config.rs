use crate::models::ProviderId;
use std::fmt;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_TELEGRAM_BASE_URL: &str = "https://api.telegram.org";

/// Connection settings for one AI provider.
///
/// A provider takes part in orchestration only when `api_key` is present.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
    pub deepseek: ProviderConfig,
    /// Provider that receives the structured (JSON) half of every content task.
    pub primary_provider: ProviderId,
    /// Provider that receives the narrative half of every content task.
    pub secondary_provider: ProviderId,
    pub provider_timeout_secs: u64,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    /// Inbound n8n webhook token; validation is skipped when unset.
    pub webhook_secret: Option<String>,
    pub n8n_webhook_url: Option<String>,
    pub n8n_auth_token: Option<String>,
    pub notion_token: Option<String>,
    pub notion_database_id: Option<String>,
    pub notion_base_url: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            openai: provider_from_env("OPENAI", DEFAULT_OPENAI_BASE_URL, "gpt-4-turbo")?,
            gemini: provider_from_env("GEMINI", DEFAULT_GEMINI_BASE_URL, "gemini-pro")?,
            deepseek: provider_from_env("DEEPSEEK", DEFAULT_DEEPSEEK_BASE_URL, "deepseek-chat")?,
            primary_provider: std::env::var("PRIMARY_PROVIDER")
                .unwrap_or_else(|_| "openai".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("PRIMARY_PROVIDER: {}", e))?,
            secondary_provider: std::env::var("SECONDARY_PROVIDER")
                .unwrap_or_else(|_| "gemini".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("SECONDARY_PROVIDER: {}", e))?,
            provider_timeout_secs: std::env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("PROVIDER_TIMEOUT_SECS must be a number of seconds"))
                .and_then(|secs| {
                    if secs == 0 {
                        anyhow::bail!("PROVIDER_TIMEOUT_SECS must be greater than zero");
                    }
                    Ok(secs)
                })?,
            llm_temperature: std::env::var("LLM_TEMPERATURE")
                .unwrap_or_else(|_| "0.7".to_string())
                .parse::<f32>()
                .map_err(|_| anyhow::anyhow!("LLM_TEMPERATURE must be a number"))
                .and_then(|t| {
                    if !(0.0..=2.0).contains(&t) {
                        anyhow::bail!("LLM_TEMPERATURE must be between 0.0 and 2.0");
                    }
                    Ok(t)
                })?,
            llm_max_tokens: std::env::var("LLM_MAX_TOKENS")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("LLM_MAX_TOKENS must be a positive number"))?,
            webhook_secret: optional_var("N8N_WEBHOOK_SECRET"),
            n8n_webhook_url: optional_var("N8N_WEBHOOK_URL")
                .map(|url| validate_base_url("N8N_WEBHOOK_URL", url))
                .transpose()?,
            n8n_auth_token: optional_var("N8N_AUTH_TOKEN"),
            notion_token: optional_var("NOTION_TOKEN"),
            notion_database_id: optional_var("NOTION_DATABASE_ID"),
            notion_base_url: base_url_var("NOTION_BASE_URL", DEFAULT_NOTION_BASE_URL)?,
            telegram_bot_token: optional_var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: optional_var("TELEGRAM_CHAT_ID"),
            telegram_base_url: base_url_var("TELEGRAM_BASE_URL", DEFAULT_TELEGRAM_BASE_URL)?,
        };

        if config.primary_provider == config.secondary_provider {
            anyhow::bail!("PRIMARY_PROVIDER and SECONDARY_PROVIDER must differ");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        let enabled = config.configured_providers();
        if enabled.is_empty() {
            tracing::warn!("⚠️  No AI provider API keys configured; content generation will report failures");
        } else {
            tracing::info!("AI providers enabled: {:?}", enabled);
        }
        tracing::debug!(
            "Routing: primary={}, secondary={}, timeout={}s",
            config.primary_provider,
            config.secondary_provider,
            config.provider_timeout_secs
        );
        if config.webhook_secret.is_none() {
            tracing::warn!("⚠️  N8N_WEBHOOK_SECRET not set; inbound webhook is unauthenticated");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn provider(&self, id: ProviderId) -> &ProviderConfig {
        match id {
            ProviderId::OpenAi => &self.openai,
            ProviderId::Gemini => &self.gemini,
            ProviderId::DeepSeek => &self.deepseek,
        }
    }

    /// Providers with an API key, in canonical order.
    pub fn configured_providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.provider(*id).api_key.is_some())
            .collect()
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn base_url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let raw = optional_var(name).unwrap_or_else(|| default.to_string());
    validate_base_url(name, raw)
}

fn provider_from_env(
    prefix: &str,
    default_base_url: &str,
    default_model: &str,
) -> anyhow::Result<ProviderConfig> {
    Ok(ProviderConfig {
        api_key: optional_var(&format!("{}_API_KEY", prefix)),
        base_url: base_url_var(&format!("{}_BASE_URL", prefix), default_base_url)?,
        model: optional_var(&format!("{}_MODEL", prefix))
            .unwrap_or_else(|| default_model.to_string()),
    })
}

/// Checks that `raw` is an absolute http(s) URL and strips any trailing slash.
pub(crate) fn validate_base_url(name: &str, raw: String) -> anyhow::Result<String> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_base_url_strips_trailing_slash() {
        let url = validate_base_url("X", "https://api.openai.com/v1/".to_string()).unwrap();
        assert_eq!(url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_validate_base_url_rejects_other_schemes() {
        assert!(validate_base_url("X", "ftp://example.com".to_string()).is_err());
        assert!(validate_base_url("X", "not a url".to_string()).is_err());
    }

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let cfg = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: "gpt-4-turbo".to_string(),
        };
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("***"));
    }
}
