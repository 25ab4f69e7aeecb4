use crate::config::Config;
use crate::errors::AppError;
use crate::models::{ProviderId, ProviderRequest, ProviderResult, TokenUsage};
use serde_json::{json, Value};
use std::fmt;
use std::time::{Duration, Instant};

/// Connection details for one configured provider.
#[derive(Clone)]
pub struct ProviderSettings {
    pub provider: ProviderId,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .finish()
    }
}

impl ProviderSettings {
    /// Returns `None` when the provider has no API key.
    pub fn from_config(config: &Config, provider: ProviderId) -> Option<Self> {
        let cfg = config.provider(provider);
        cfg.api_key.as_ref().map(|key| Self {
            provider,
            base_url: cfg.base_url.clone(),
            api_key: key.clone(),
            model: cfg.model.clone(),
        })
    }
}

fn redact(key: &str) -> String {
    if key.len() <= 8 {
        "***".to_string()
    } else {
        format!("{}***", key.chars().take(4).collect::<String>())
    }
}

/// Request/response dialect spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `POST {base}/chat/completions` with bearer auth (OpenAI, DeepSeek).
    ChatCompletions,
    /// `POST {base}/models/{model}:generateContent?key=...` (Gemini).
    GenerateContent,
}

impl WireFormat {
    pub fn for_provider(provider: ProviderId) -> Self {
        match provider {
            ProviderId::OpenAi | ProviderId::DeepSeek => WireFormat::ChatCompletions,
            ProviderId::Gemini => WireFormat::GenerateContent,
        }
    }

    /// Endpoint without credentials, safe to log.
    fn endpoint(&self, base_url: &str, model: &str) -> String {
        match self {
            WireFormat::ChatCompletions => format!("{}/chat/completions", base_url),
            WireFormat::GenerateContent => {
                format!("{}/models/{}:generateContent", base_url, model)
            }
        }
    }

    fn build_body(&self, request: &ProviderRequest, model: &str) -> Value {
        match self {
            WireFormat::ChatCompletions => json!({
                "model": model,
                "messages": [{"role": "user", "content": request.prompt}],
                "temperature": request.temperature,
                "max_tokens": request.max_tokens,
            }),
            WireFormat::GenerateContent => json!({
                "contents": [{"parts": [{"text": request.prompt}]}],
                "generationConfig": {
                    "temperature": request.temperature,
                    "maxOutputTokens": request.max_tokens,
                },
            }),
        }
    }

    /// Pulls the generated text out of a raw provider payload.
    pub fn extract_text(&self, raw: &Value) -> Result<String, String> {
        let text = match self {
            WireFormat::ChatCompletions => raw
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("message"))
                .and_then(|m| m.get("content"))
                .and_then(|c| c.as_str())
                .map(str::to_string)
                .ok_or_else(|| "response missing choices[0].message.content".to_string())?,
            WireFormat::GenerateContent => {
                let candidate = raw
                    .get("candidates")
                    .and_then(|c| c.get(0))
                    .ok_or_else(|| {
                        match raw
                            .get("promptFeedback")
                            .and_then(|f| f.get("blockReason"))
                            .and_then(|r| r.as_str())
                        {
                            Some(reason) => format!("prompt blocked by provider: {}", reason),
                            None => "response has no candidates".to_string(),
                        }
                    })?;
                let parts = candidate
                    .get("content")
                    .and_then(|c| c.get("parts"))
                    .and_then(|p| p.as_array())
                    .ok_or_else(|| "response missing candidates[0].content.parts".to_string())?;
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            }
        };

        if text.trim().is_empty() {
            return Err("provider returned empty content".to_string());
        }
        Ok(text)
    }

    pub fn extract_usage(&self, raw: &Value) -> Option<TokenUsage> {
        let count = |v: &Value, key: &str| v.get(key).and_then(|n| n.as_u64()).unwrap_or(0) as u32;
        match self {
            WireFormat::ChatCompletions => raw.get("usage").map(|u| TokenUsage {
                prompt_tokens: count(u, "prompt_tokens"),
                completion_tokens: count(u, "completion_tokens"),
                total_tokens: count(u, "total_tokens"),
            }),
            WireFormat::GenerateContent => raw.get("usageMetadata").map(|u| TokenUsage {
                prompt_tokens: count(u, "promptTokenCount"),
                completion_tokens: count(u, "candidatesTokenCount"),
                total_tokens: count(u, "totalTokenCount"),
            }),
        }
    }
}

/// Strips a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        // One-line fence: drop a language tag directly followed by an object or array.
        None => {
            let untagged = rest
                .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                .trim_start();
            if untagged.starts_with('{') || untagged.starts_with('[') {
                untagged
            } else {
                rest
            }
        }
    };
    body.trim_end().trim_end_matches("```").trim()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Transport,
    Timeout,
    Status(u16),
    /// Reply arrived but the expected content was absent or unparsable.
    Malformed,
}

#[derive(Debug, Clone)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub raw: Option<String>,
}

impl ProviderError {
    fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raw: None,
        }
    }

    fn with_raw(mut self, raw: String) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Whether this failure says something about the provider's availability.
    pub fn trips_breaker(&self) -> bool {
        !matches!(self.kind, ProviderErrorKind::Malformed)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Normalized successful reply.
#[derive(Debug, Clone)]
pub struct Completion {
    pub model: String,
    pub content: String,
    pub structured: Option<Value>,
    pub usage: Option<TokenUsage>,
}

/// HTTP client for a single provider.
#[derive(Clone)]
pub struct ProviderClient {
    client: reqwest::Client,
    settings: ProviderSettings,
    format: WireFormat,
}

impl ProviderClient {
    pub fn new(settings: ProviderSettings) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!(
                    "Failed to create {} client: {}",
                    settings.provider, e
                ))
            })?;

        Ok(Self {
            client,
            format: WireFormat::for_provider(settings.provider),
            settings,
        })
    }

    pub fn provider(&self) -> ProviderId {
        self.settings.provider
    }

    pub fn model_for(&self, request: &ProviderRequest) -> String {
        request
            .model
            .clone()
            .unwrap_or_else(|| self.settings.model.clone())
    }

    /// Issues one request and always returns a result; failures are data.
    pub async fn call(&self, request: &ProviderRequest, timeout: Duration) -> ProviderResult {
        let started = Instant::now();
        let outcome = self.try_call(request, timeout).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(completion) => ProviderResult::success(
                self.provider(),
                completion.model,
                completion.content,
                completion.structured,
                completion.usage,
                latency_ms,
            ),
            Err(e) => ProviderResult::failure(
                self.provider(),
                self.model_for(request),
                e.message.clone(),
                latency_ms,
            )
            .with_raw_response(e.raw),
        }
    }

    /// Like [`ProviderClient::call`] but keeps the error classification.
    pub async fn try_call(
        &self,
        request: &ProviderRequest,
        timeout: Duration,
    ) -> Result<Completion, ProviderError> {
        match tokio::time::timeout(timeout, self.send(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "⚠️  {} call timed out after {}ms",
                    self.provider(),
                    timeout.as_millis()
                );
                Err(ProviderError::new(
                    ProviderErrorKind::Timeout,
                    format!("{} request timed out after {}ms", self.provider(), timeout.as_millis()),
                ))
            }
        }
    }

    async fn send(&self, request: &ProviderRequest) -> Result<Completion, ProviderError> {
        let provider = self.provider();
        let model = self.model_for(request);
        let url = self.format.endpoint(&self.settings.base_url, &model);
        let body = self.format.build_body(request, &model);

        tracing::info!(
            "Calling {} ({}) at {} [key {}]",
            provider,
            model,
            url,
            redact(&self.settings.api_key)
        );

        let builder = match self.format {
            WireFormat::ChatCompletions => self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.settings.api_key)),
            WireFormat::GenerateContent => self
                .client
                .post(&url)
                .query(&[("key", self.settings.api_key.as_str())]),
        };

        let response = builder.json(&body).send().await.map_err(|e| {
            let kind = if e.is_timeout() {
                ProviderErrorKind::Timeout
            } else {
                ProviderErrorKind::Transport
            };
            // reqwest errors can embed the URL; drop the query string carrying the key
            let e = e.without_url();
            tracing::error!("❌ {} request failed: {}", provider, e);
            ProviderError::new(kind, format!("{} request failed: {}", provider, e))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::Transport,
                format!("Failed to read {} response: {}", provider, e.without_url()),
            )
        })?;

        if !status.is_success() {
            tracing::error!("❌ {} returned {}", provider, status);
            return Err(ProviderError::new(
                ProviderErrorKind::Status(status.as_u16()),
                format!("{} returned {}: {}", provider, status, text),
            )
            .with_raw(text));
        }

        let raw: Value = serde_json::from_str(&text).map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::Malformed,
                format!("Failed to parse {} response: {}", provider, e),
            )
            .with_raw(text.clone())
        })?;

        let content = self.format.extract_text(&raw).map_err(|reason| {
            tracing::warn!("⚠️  Malformed {} response: {}", provider, reason);
            ProviderError::new(
                ProviderErrorKind::Malformed,
                format!("Malformed {} response: {}", provider, reason),
            )
            .with_raw(text.clone())
        })?;

        let structured = if request.expect_json {
            let parsed = serde_json::from_str::<Value>(strip_code_fence(&content)).map_err(|e| {
                tracing::warn!("⚠️  {} returned non-JSON content: {}", provider, e);
                ProviderError::new(
                    ProviderErrorKind::Malformed,
                    format!("{} content is not valid JSON: {}", provider, e),
                )
                .with_raw(content.clone())
            })?;
            Some(parsed)
        } else {
            None
        };

        let usage = self.format.extract_usage(&raw);
        let model = raw
            .get("model")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or(model);

        tracing::info!(
            "✓ {} responded ({} chars, {} tokens)",
            provider,
            content.len(),
            usage.map(|u| u.total_tokens).unwrap_or(0)
        );

        Ok(Completion {
            model,
            content,
            structured,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_completions_extraction() {
        let raw = json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        });
        let format = WireFormat::ChatCompletions;
        assert_eq!(format.extract_text(&raw).unwrap(), "hello");
        assert_eq!(format.extract_usage(&raw).unwrap().total_tokens, 5);
    }

    #[test]
    fn test_generate_content_joins_parts() {
        let raw = json!({
            "candidates": [{"content": {"parts": [{"text": "foo "}, {"text": "bar"}]}}],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 6, "totalTokenCount": 10}
        });
        let format = WireFormat::GenerateContent;
        assert_eq!(format.extract_text(&raw).unwrap(), "foo bar");
        let usage = format.extract_usage(&raw).unwrap();
        assert_eq!(usage.completion_tokens, 6);
        assert_eq!(usage.total_tokens, 10);
    }

    #[test]
    fn test_generate_content_block_reason() {
        let raw = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = WireFormat::GenerateContent.extract_text(&raw).unwrap_err();
        assert!(err.contains("SAFETY"));
    }

    #[test]
    fn test_missing_content_is_error() {
        assert!(WireFormat::ChatCompletions
            .extract_text(&json!({"choices": []}))
            .is_err());
        assert!(WireFormat::ChatCompletions
            .extract_text(&json!({"choices": [{"message": {"content": "  "}}]}))
            .is_err());
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_strip_one_line_fence_with_language_tag() {
        assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```JSON [1, 2]```"), "[1, 2]");
        assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```42```"), "42");
        let parsed: Value = serde_json::from_str(strip_code_fence("```json{\"a\":1}```")).unwrap();
        assert_eq!(parsed["a"], 1);
    }

    #[test]
    fn test_wire_format_selection() {
        assert_eq!(
            WireFormat::for_provider(ProviderId::DeepSeek),
            WireFormat::ChatCompletions
        );
        assert_eq!(
            WireFormat::for_provider(ProviderId::Gemini),
            WireFormat::GenerateContent
        );
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("short"), "***");
        assert_eq!(redact("sk-abcdefghijkl"), "sk-a***");
    }
}
