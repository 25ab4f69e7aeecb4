use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::models::{CompositeArtifact, FlattenedArtifact};
use async_trait::async_trait;
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Downstream consumer of composed artifacts. One call per artifact, no retries.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, artifact: &FlattenedArtifact) -> Result<(), AppError>;
}

fn http_client(sink: &str) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| AppError::ExternalApiError(format!("Failed to create {} client: {}", sink, e)))
}

async fn ensure_success(sink: &str, response: reqwest::Response) -> Result<(), AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AppError::ExternalApiError(format!(
            "{} returned {}: {}",
            sink, status, error_text
        )));
    }
    Ok(())
}

/// Posts the flattened artifact to an n8n workflow webhook.
#[derive(Clone)]
pub struct N8nWorkflowSink {
    client: reqwest::Client,
    webhook_url: String,
    auth_token: Option<String>,
}

impl N8nWorkflowSink {
    pub fn new(webhook_url: String, auth_token: Option<String>) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client("n8n")?,
            webhook_url,
            auth_token,
        })
    }

    /// Posts an arbitrary workflow event to the n8n webhook.
    pub async fn trigger(&self, event: &serde_json::Value) -> Result<(), AppError> {
        let mut request = self.client.post(&self.webhook_url).json(event);
        if let Some(ref token) = self.auth_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.context("n8n webhook request failed")?;
        ensure_success("n8n", response).await
    }
}

#[async_trait]
impl ArtifactSink for N8nWorkflowSink {
    fn name(&self) -> &'static str {
        "n8n"
    }

    async fn deliver(&self, artifact: &FlattenedArtifact) -> Result<(), AppError> {
        tracing::info!("Triggering n8n workflow for artifact {}", artifact.artifact_id);
        self.trigger(&json!({
            "event": "artifact_composed",
            "artifact": artifact,
        }))
        .await?;
        tracing::info!("✓ n8n workflow triggered for {}", artifact.artifact_id);
        Ok(())
    }
}

/// Creates one page per artifact in a Notion database.
#[derive(Clone)]
pub struct NotionSink {
    client: reqwest::Client,
    base_url: String,
    token: String,
    database_id: String,
}

const NOTION_VERSION: &str = "2022-06-28";
// Notion rejects rich_text blocks longer than this.
const NOTION_TEXT_LIMIT: usize = 2000;

impl NotionSink {
    pub fn new(base_url: String, token: String, database_id: String) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client("Notion")?,
            base_url,
            token,
            database_id,
        })
    }

    fn page_body(&self, artifact: &FlattenedArtifact) -> serde_json::Value {
        let summary: String = artifact.text.chars().take(NOTION_TEXT_LIMIT).collect();
        json!({
            "parent": {"database_id": self.database_id},
            "properties": {
                "Name": {"title": [{"text": {"content": artifact.subject}}]},
                "Artifact ID": {"rich_text": [{"text": {"content": artifact.artifact_id}}]},
                "Score": {"number": artifact.score},
                "Tier": {"select": artifact.tier.map(|t| json!({"name": t.to_string()}))},
                "Estimated Value": {"number": artifact.estimated_value},
                "Closing Probability": {"number": artifact.closing_probability},
                "Recommended Package": {"rich_text": [{"text": {
                    "content": artifact.recommended_package.clone().unwrap_or_else(|| "custom".to_string())
                }}]},
                "Next Action": {"rich_text": [{"text": {
                    "content": artifact.recommended_action.clone().unwrap_or_default()
                }}]},
                "Created": {"date": {"start": artifact.generated_at.to_rfc3339()}},
            },
            "children": [{
                "object": "block",
                "type": "paragraph",
                "paragraph": {"rich_text": [{"type": "text", "text": {"content": summary}}]},
            }],
        })
    }
}

#[async_trait]
impl ArtifactSink for NotionSink {
    fn name(&self) -> &'static str {
        "notion"
    }

    async fn deliver(&self, artifact: &FlattenedArtifact) -> Result<(), AppError> {
        let url = format!("{}/pages", self.base_url);
        tracing::info!("Creating Notion page for artifact {}", artifact.artifact_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", NOTION_VERSION)
            .json(&self.page_body(artifact))
            .send()
            .await
            .context("Notion request failed")?;
        ensure_success("Notion", response).await?;

        tracing::info!("✓ Notion page created for {}", artifact.artifact_id);
        Ok(())
    }
}

/// Sends a short summary to a Telegram chat.
#[derive(Clone)]
pub struct TelegramSink {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(base_url: String, bot_token: String, chat_id: String) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client("Telegram")?,
            base_url,
            bot_token,
            chat_id,
        })
    }
}

pub fn telegram_message(artifact: &FlattenedArtifact) -> String {
    let mut lines = vec![format!("🎯 New lead artifact: {}", artifact.subject)];
    if let (Some(score), Some(tier)) = (artifact.score, artifact.tier) {
        lines.push(format!("Score: {}/100 ({})", score, tier));
    }
    if let Some(value) = artifact.estimated_value {
        lines.push(format!("Estimated value: ${:.0}", value));
    }
    if let Some(ref action) = artifact.recommended_action {
        lines.push(format!("Next action: {}", action));
    }
    lines.push(format!(
        "Package: {}",
        artifact.recommended_package.as_deref().unwrap_or("custom solution")
    ));
    lines.push(format!("ID: {}", artifact.artifact_id));
    lines.join("\n")
}

#[async_trait]
impl ArtifactSink for TelegramSink {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, artifact: &FlattenedArtifact) -> Result<(), AppError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        tracing::info!("Sending Telegram notification for {}", artifact.artifact_id);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": telegram_message(artifact),
            }))
            .send()
            .await
            // the bot token is part of the URL
            .map_err(|e| e.without_url())
            .context("Telegram request failed")?;
        ensure_success("Telegram", response).await?;

        tracing::info!("✓ Telegram notification sent for {}", artifact.artifact_id);
        Ok(())
    }
}

/// n8n client for workflow events, when `N8N_WEBHOOK_URL` is set.
pub fn workflow_trigger_from_config(config: &Config) -> Result<Option<N8nWorkflowSink>, AppError> {
    config
        .n8n_webhook_url
        .as_ref()
        .map(|url| N8nWorkflowSink::new(url.clone(), config.n8n_auth_token.clone()))
        .transpose()
}

/// Builds every sink whose settings are complete.
pub fn sinks_from_config(config: &Config) -> Result<Vec<Arc<dyn ArtifactSink>>, AppError> {
    let mut sinks: Vec<Arc<dyn ArtifactSink>> = Vec::new();

    if let Some(n8n) = workflow_trigger_from_config(config)? {
        sinks.push(Arc::new(n8n));
    }
    if let (Some(token), Some(database_id)) = (&config.notion_token, &config.notion_database_id) {
        sinks.push(Arc::new(NotionSink::new(
            config.notion_base_url.clone(),
            token.clone(),
            database_id.clone(),
        )?));
    }
    if let (Some(token), Some(chat_id)) = (&config.telegram_bot_token, &config.telegram_chat_id) {
        sinks.push(Arc::new(TelegramSink::new(
            config.telegram_base_url.clone(),
            token.clone(),
            chat_id.clone(),
        )?));
    }

    let names: Vec<_> = sinks.iter().map(|s| s.name()).collect();
    tracing::info!("Notification sinks enabled: {:?}", names);
    Ok(sinks)
}

/// Hands the artifact to every sink in the background.
///
/// Each artifact id is delivered at most once per `delivered` TTL window.
/// Failures are logged and dropped.
pub async fn dispatch_notifications(
    sinks: &[Arc<dyn ArtifactSink>],
    delivered: &Cache<String, ()>,
    artifact: &CompositeArtifact,
) {
    if sinks.is_empty() {
        return;
    }

    let entry = delivered
        .entry(artifact.artifact_id.clone())
        .or_insert(())
        .await;
    if !entry.is_fresh() {
        tracing::debug!(
            "Skipping notifications for {}: already delivered recently",
            artifact.artifact_id
        );
        return;
    }

    let flat = Arc::new(artifact.flatten());
    for sink in sinks {
        let sink = sink.clone();
        let flat = flat.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.deliver(&flat).await {
                tracing::error!(
                    "❌ {} notification failed for {}: {}",
                    sink.name(),
                    flat.artifact_id,
                    e
                );
            }
        });
    }
}
