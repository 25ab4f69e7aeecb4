use crate::catalog::{self, ClientInfo};
use crate::errors::{AppError, AppJson};
use crate::handlers::{qualify, qualify_response, AppState};
use crate::models::{number_or_numeric_string, LeadRequest};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Inbound n8n workflow trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowTrigger {
    pub workflow_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct ProposalTrigger {
    #[serde(default)]
    client_name: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default = "default_package")]
    service_package: String,
    #[serde(default)]
    requirements: Option<String>,
    #[serde(default, deserialize_with = "number_or_numeric_string")]
    budget: Option<f64>,
}

fn default_package() -> String {
    "ai_brand_transformation".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct DeliveryTrigger {
    service_type: String,
    #[serde(default)]
    client_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OnboardingTrigger {
    #[serde(default)]
    client_info: ClientInfo,
}

#[derive(Debug, Clone, Deserialize)]
struct CampaignTrigger {
    #[serde(default = "default_market")]
    target_market: String,
    #[serde(default = "default_min_budget")]
    min_budget: u32,
}

fn default_market() -> String {
    "small_business".to_string()
}

fn default_min_budget() -> u32 {
    2000
}

const DELIVERY_STEPS: [&str; 5] = [
    "Setup AI infrastructure",
    "Configure custom models",
    "Deploy automation workflows",
    "Train client team",
    "Create documentation",
];

const ONBOARDING_STEPS: [&str; 5] = [
    "Send welcome email with Event OS license",
    "Create client portal access",
    "Schedule training session",
    "Setup billing and payment",
    "Assign account manager",
];

fn parse<T: serde::de::DeserializeOwned>(data: Value, what: &str) -> Result<T, AppError> {
    let data = if data.is_null() { json!({}) } else { data };
    serde_json::from_value(data)
        .map_err(|e| AppError::BadRequest(format!("Invalid {} payload: {}", what, e)))
}

/// Forwards a workflow event to n8n. Returns whether n8n accepted it.
async fn forward_to_n8n(state: &AppState, event: Value) -> bool {
    let Some(ref trigger) = state.workflow_trigger else {
        return false;
    };
    match trigger.trigger(&event).await {
        Ok(()) => {
            tracing::info!("✓ n8n workflow event sent: {}", event["action"]);
            true
        }
        Err(e) => {
            tracing::error!("❌ n8n workflow event {} failed: {}", event["action"], e);
            false
        }
    }
}

fn campaign_workflows(target_market: &str, min_budget: u32) -> Value {
    json!({
        "target_market": target_market,
        "lead_generation": {
            "channels": ["LinkedIn", "Email", "Social Media"],
            "messaging": format!(
                "Transform your business with Nine Pillars AI - Starting at ${}",
                catalog::with_thousands(min_budget)
            ),
            "daily_outreach": 50,
        },
        "qualification": {
            "criteria": [
                format!("Budget of ${}+", catalog::with_thousands(min_budget)),
                "Decision maker contact",
                "Timeline under 3 months",
                "Clear AI use case",
            ],
            "auto_score": true,
        },
        "followup": {
            "sequences": {
                "hot_lead": ["Same-day call", "Proposal within 24 hours"],
                "warm_lead": ["Follow-up in 3 days", "Case study", "15-minute call"],
                "nurture": ["Weekly AI insights", "Monthly check-in"],
            },
        },
    })
}

/// n8n Webhook Handler
///
/// Dispatches on `workflow_type`:
/// - `lead_qualification`: `data` is a lead; returns the verdict.
/// - `proposal_generation`: returns a package proposal plus its Event OS license.
/// - `service_delivery`: delivery plan for one catalog service.
/// - `client_onboarding`: onboarding steps for a new client.
/// - `sales_campaign`: outreach, qualification and follow-up workflows.
/// - anything else is acknowledged with 202 and not processed.
///
/// Handled workflows are forwarded to n8n when `N8N_WEBHOOK_URL` is set.
///
/// Authentication: X-Webhook-Token header must match N8N_WEBHOOK_SECRET when set.
pub async fn n8n_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(trigger): AppJson<WorkflowTrigger>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    validate_webhook_secret(&state, &headers)?;

    tracing::info!("🔄 n8n workflow triggered: {}", trigger.workflow_type);

    match trigger.workflow_type.trim() {
        "" => Err(AppError::BadRequest("workflow_type is required".to_string())),
        "lead_qualification" => {
            let lead_data = trigger.data.clone();
            let request: LeadRequest = parse(trigger.data, "lead")?;
            let (lead, assessment) = qualify(&state, request)?;
            let qualification = qualify_response(&lead, assessment);

            let triggered = forward_to_n8n(
                &state,
                json!({
                    "action": "lead_qualified",
                    "lead_data": lead_data,
                    "qualification": qualification,
                    "next_workflow": "proposal_generation",
                }),
            )
            .await;

            Ok((
                StatusCode::OK,
                Json(json!({
                    "status": "lead_qualified",
                    "qualification": qualification,
                    "next_steps": ["proposal_generation", "contact_client"],
                    "n8n_workflow_triggered": triggered,
                })),
            ))
        }
        "proposal_generation" => {
            let request: ProposalTrigger = parse(trigger.data, "proposal")?;

            let proposal = catalog::build_proposal(&request.service_package, request.requirements)?;
            let company = if request.company.is_empty() {
                request.client_name.clone()
            } else {
                request.company
            };
            let license = catalog::generate_license(
                ClientInfo {
                    name: request.client_name.clone(),
                    company,
                    email: request.email,
                    phone: request.phone,
                },
                &request.service_package,
                chrono::Utc::now(),
            )?;

            state.repository().record_proposal();
            state.repository().record_license();

            let triggered = forward_to_n8n(
                &state,
                json!({
                    "action": "proposal_generated",
                    "proposal_data": {
                        "client_name": request.client_name,
                        "service_package": request.service_package,
                        "content": proposal,
                        "license": license,
                        "budget": request.budget,
                    },
                    "next_workflow": "service_delivery",
                }),
            )
            .await;

            Ok((
                StatusCode::OK,
                Json(json!({
                    "status": "proposal_generated",
                    "proposal": proposal,
                    "license": license,
                    "n8n_workflow_triggered": triggered,
                })),
            ))
        }
        "service_delivery" => {
            let request: DeliveryTrigger = parse(trigger.data, "delivery")?;
            let service = catalog::find_service(&request.service_type).ok_or_else(|| {
                AppError::NotFound(format!("Unknown service type: {}", request.service_type))
            })?;

            let delivery_plan = json!({
                "service_type": service.id,
                "service_name": service.name,
                "client_name": request.client_name,
                "delivery_steps": DELIVERY_STEPS,
                "estimated_completion": chrono::Utc::now() + chrono::Duration::hours(48),
            });

            let triggered = forward_to_n8n(
                &state,
                json!({
                    "action": "service_delivery_started",
                    "delivery_plan": delivery_plan,
                    "next_workflow": "client_training",
                }),
            )
            .await;

            Ok((
                StatusCode::OK,
                Json(json!({
                    "status": "delivery_started",
                    "delivery_plan": delivery_plan,
                    "n8n_workflow_triggered": triggered,
                })),
            ))
        }
        "client_onboarding" => {
            let request: OnboardingTrigger = parse(trigger.data, "onboarding")?;

            let triggered = forward_to_n8n(
                &state,
                json!({
                    "action": "client_onboarding_started",
                    "client_info": request.client_info,
                    "workflow_steps": ONBOARDING_STEPS,
                }),
            )
            .await;

            Ok((
                StatusCode::OK,
                Json(json!({
                    "status": "onboarding_started",
                    "client_name": request.client_info.name,
                    "workflow_steps": ONBOARDING_STEPS,
                    "n8n_workflow_triggered": triggered,
                })),
            ))
        }
        "sales_campaign" => {
            let request: CampaignTrigger = parse(trigger.data, "campaign")?;
            let workflows = campaign_workflows(&request.target_market, request.min_budget);

            let triggered = forward_to_n8n(
                &state,
                json!({
                    "action": "sales_campaign_started",
                    "campaign_workflows": workflows,
                }),
            )
            .await;

            Ok((
                StatusCode::OK,
                Json(json!({
                    "status": "campaign_started",
                    "campaign_workflows": workflows,
                    "n8n_workflow_triggered": triggered,
                })),
            ))
        }
        other => {
            tracing::info!("Unhandled workflow type acknowledged: {}", other);
            Ok((
                StatusCode::ACCEPTED,
                Json(json!({
                    "status": "processing",
                    "workflow_type": other,
                    "analysis": format!("Processing {} workflow", other),
                    "n8n_workflow_triggered": false,
                })),
            ))
        }
    }
}

/// Validate webhook secret from X-Webhook-Token header
fn validate_webhook_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    // If no secret is configured, skip validation (warn was already logged at startup)
    let Some(ref expected_secret) = state.config.webhook_secret else {
        return Ok(());
    };

    let token = headers
        .get("X-Webhook-Token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Webhook-Token header".to_string()))?;

    if !constant_time_compare(token, expected_secret) {
        tracing::warn!("Invalid webhook token received");
        return Err(AppError::Unauthorized("Invalid webhook token".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
