use crate::catalog::{self, ClientInfo, UsageContext, PACKAGES, PRICING_TIERS, SERVICES};
use crate::composer::{CompositionInput, SolutionComposer};
use crate::config::Config;
use crate::errors::{AppError, AppJson, ResultExt};
use crate::models::*;
use crate::followup::followup_message;
use crate::notifier::{
    dispatch_notifications, sinks_from_config, workflow_trigger_from_config, ArtifactSink,
    N8nWorkflowSink,
};
use crate::orchestrator::{ProviderOrchestrator, TaskPlan};
use crate::prompts::{plan_for, BriefDetails, Routing};
use crate::repository::{ArtifactRepository, DashboardSnapshot};
use crate::scoring::ScoringEngine;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    pub scoring: ScoringEngine,
    /// Fan-out client over every configured AI provider.
    pub orchestrator: ProviderOrchestrator,
    /// Composer; owns the artifact repository.
    pub composer: SolutionComposer,
    /// Downstream notifiers (n8n, Notion, Telegram) that are configured.
    pub sinks: Vec<Arc<dyn ArtifactSink>>,
    /// Artifact ids already handed to the sinks (5 minute TTL).
    pub delivered_cache: Cache<String, ()>,
    /// Forwards inbound workflow events back to n8n.
    pub workflow_trigger: Option<N8nWorkflowSink>,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let orchestrator =
            ProviderOrchestrator::from_config(&config).context("initializing provider clients")?;
        let sinks = sinks_from_config(&config).context("initializing notification sinks")?;
        let workflow_trigger =
            workflow_trigger_from_config(&config).context("initializing n8n workflow trigger")?;

        let state = Self::new(config, orchestrator, sinks);
        Ok(match workflow_trigger {
            Some(trigger) => state.with_workflow_trigger(trigger),
            None => state,
        })
    }

    pub fn new(
        config: Config,
        orchestrator: ProviderOrchestrator,
        sinks: Vec<Arc<dyn ArtifactSink>>,
    ) -> Self {
        Self {
            config,
            scoring: ScoringEngine::new(),
            orchestrator,
            composer: SolutionComposer::new(ArtifactRepository::default()),
            sinks,
            delivered_cache: Cache::builder()
                .time_to_live(Duration::from_secs(300))
                .max_capacity(10_000)
                .build(),
            workflow_trigger: None,
        }
    }

    pub fn with_workflow_trigger(mut self, trigger: N8nWorkflowSink) -> Self {
        self.workflow_trigger = Some(trigger);
        self
    }

    pub fn repository(&self) -> &ArtifactRepository {
        self.composer.repository()
    }
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-loa-api",
            "version": env!("CARGO_PKG_VERSION"),
            "providers": state.orchestrator.configured_providers(),
        })),
    )
}

/// GET /api/v1/services
pub async fn list_services() -> Json<serde_json::Value> {
    Json(json!({
        "services": &SERVICES,
        "count": SERVICES.len(),
    }))
}

/// GET /api/v1/packages
pub async fn list_packages() -> Json<serde_json::Value> {
    Json(json!({
        "packages": &PACKAGES,
        "pricing_tiers": &PRICING_TIERS,
    }))
}

#[derive(Debug, Clone, Serialize)]
pub struct QualifyResponse {
    pub lead_id: String,
    pub verdict: QualificationVerdict,
    pub deal_probability: DealProbability,
    pub recommended_package: Option<&'static str>,
    pub follow_up: String,
}

/// Validates, scores and counts a lead. Shared by the HTTP and webhook paths.
pub(crate) fn qualify(state: &AppState, request: LeadRequest) -> Result<(Lead, LeadAssessment), AppError> {
    let lead = Lead::try_from(request)?;
    let assessment = state.scoring.assess(&lead);
    state.repository().record_qualification(&assessment.verdict);

    tracing::info!(
        "Lead {} qualified: score={} tier={} deal_probability={}",
        lead.id,
        assessment.verdict.score,
        assessment.verdict.tier,
        assessment.deal_probability.probability
    );

    Ok((lead, assessment))
}

pub(crate) fn qualify_response(lead: &Lead, assessment: LeadAssessment) -> QualifyResponse {
    QualifyResponse {
        lead_id: lead.id.clone(),
        recommended_package: catalog::recommend_package(lead.budget).map(|p| p.id),
        follow_up: followup_message(assessment.verdict.tier, lead),
        verdict: assessment.verdict,
        deal_probability: assessment.deal_probability,
    }
}

/// POST /api/v1/leads/qualify
///
/// Scores a lead without calling any provider.
pub async fn qualify_lead(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<LeadRequest>,
) -> Result<Json<QualifyResponse>, AppError> {
    let (lead, assessment) = qualify(&state, payload)?;
    Ok(Json(qualify_response(&lead, assessment)))
}

/// Body of `POST /api/v1/leads`: the lead plus the content to generate for it.
#[derive(Debug, Clone, Deserialize)]
pub struct ComposeLeadRequest {
    #[serde(flatten)]
    pub lead: LeadRequest,
    #[serde(default)]
    pub tasks: Vec<ContentTask>,
    #[serde(default)]
    pub brief: BriefDetails,
}

/// POST /api/v1/leads
///
/// Qualifies the lead, runs the requested content tasks across the
/// configured providers, composes the artifact and notifies the sinks.
/// Provider failures are reported inside the artifact, never as an error.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<ComposeLeadRequest>,
) -> Result<(StatusCode, Json<CompositeArtifact>), AppError> {
    let ComposeLeadRequest { lead, tasks, brief } = payload;
    let (lead, assessment) = qualify(&state, lead)?;

    let mut unique_tasks: Vec<ContentTask> = Vec::with_capacity(tasks.len());
    for task in tasks {
        if !unique_tasks.contains(&task) {
            unique_tasks.push(task);
        }
    }

    let routing = Routing::from_config(&state.config);
    let plans = unique_tasks
        .iter()
        .map(|task| plan_for(*task, &lead, &brief, &routing))
        .collect::<Result<Vec<TaskPlan>, AppError>>()?;

    let sections = if plans.is_empty() {
        Vec::new()
    } else {
        state.orchestrator.execute_all(&plans).await
    };

    let subject = if lead.company.is_empty() {
        lead.name.clone()
    } else {
        lead.company.clone()
    };

    let artifact = state
        .composer
        .compose(CompositionInput {
            subject,
            lead: Some(lead),
            assessment: Some(assessment),
            sections,
        })
        .await
        .context("composing lead artifact")?;

    dispatch_notifications(&state.sinks, &state.delivered_cache, &artifact).await;

    Ok((StatusCode::CREATED, Json(artifact.as_ref().clone())))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProposalRequest {
    pub service_package: String,
    #[serde(default)]
    pub client_requirements: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub timeline: Option<String>,
}

/// POST /api/v1/proposals
pub async fn create_proposal(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<ProposalRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("Generating proposal for package {}", payload.service_package);

    let proposal = catalog::build_proposal(&payload.service_package, payload.client_requirements)?;
    state.repository().record_proposal();

    Ok(Json(json!({
        "status": "proposal_generated",
        "proposal": proposal,
        "next_steps": ["send_invoice", "get_approval", "start_work"],
    })))
}

#[derive(Debug, Clone, Deserialize)]
pub struct LicenseRequest {
    pub service_package: String,
    #[serde(default)]
    pub client_info: ClientInfo,
}

/// POST /api/v1/licenses
pub async fn create_license(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<LicenseRequest>,
) -> Result<Json<catalog::LicenseDocument>, AppError> {
    let document = catalog::generate_license(
        payload.client_info,
        &payload.service_package,
        chrono::Utc::now(),
    )?;
    state.repository().record_license();
    Ok(Json(document))
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyLicenseRequest {
    pub service_package: String,
    #[serde(default)]
    pub client_info: ClientInfo,
    #[serde(default)]
    pub usage_context: UsageContext,
}

/// POST /api/v1/licenses/verify
///
/// Checks an intended use against the license a package carries.
/// Does not count as an issued license.
pub async fn verify_license(
    AppJson(payload): AppJson<VerifyLicenseRequest>,
) -> Result<Json<catalog::ComplianceReport>, AppError> {
    let document = catalog::generate_license(
        payload.client_info,
        &payload.service_package,
        chrono::Utc::now(),
    )?;
    Ok(Json(catalog::verify_compliance(
        &document,
        &payload.usage_context,
    )))
}

/// GET /api/v1/artifacts/:id
pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CompositeArtifact>, AppError> {
    let artifact = state
        .repository()
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Artifact {} not found", id)))?;
    Ok(Json(artifact.as_ref().clone()))
}

/// GET /api/v1/dashboard
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardSnapshot> {
    Json(state.repository().dashboard())
}
