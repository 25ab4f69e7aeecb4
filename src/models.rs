use crate::errors::AppError;
use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("email regex is valid")
});

// ============ Leads ============

/// Contact channels supplied with a lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Lead as received on the wire. Every field is optional; [`Lead::try_from`]
/// decides what is acceptable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub company: Option<String>,
    pub business_type: Option<String>,
    #[serde(default, deserialize_with = "number_or_numeric_string")]
    pub budget: Option<f64>,
    pub timeline: Option<String>,
    pub requirements: Option<String>,
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub contact_info: ContactInfo,
    /// Flat aliases accepted from forms and workflow tools.
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

/// Accepts `5000`, `"5000"` and form-style `"$5,000"`. Blank strings count as absent.
pub(crate) fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(raw)) => {
            let cleaned: String = raw
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|c| *c != ',')
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned
                .parse::<f64>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid budget: {:?}", raw)))
        }
    }
}

/// Largest budget a lead may declare.
pub const MAX_BUDGET: f64 = 1e12;

/// A validated prospective customer. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub company: String,
    pub business_type: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub budget: Decimal,
    pub timeline: String,
    pub requirements: String,
    pub pain_points: Vec<String>,
    pub contact_info: ContactInfo,
}

impl Lead {
    /// Requirements and pain points joined into one searchable string.
    pub fn pain_text(&self) -> String {
        let mut text = self.requirements.clone();
        for point in &self.pain_points {
            text.push(' ');
            text.push_str(point);
        }
        text
    }
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() >= 5 && EMAIL_REGEX.is_match(email)
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<LeadRequest> for Lead {
    type Error = AppError;

    fn try_from(req: LeadRequest) -> Result<Self, Self::Error> {
        let name = clean(req.name)
            .ok_or_else(|| AppError::BadRequest("Lead name is required".to_string()))?;

        let email = clean(req.contact_info.email).or_else(|| clean(req.email));
        let phone = clean(req.contact_info.phone).or_else(|| clean(req.phone));

        if email.is_none() && phone.is_none() {
            return Err(AppError::BadRequest(
                "At least one contact channel required (email or phone)".to_string(),
            ));
        }

        if let Some(ref e) = email {
            if !is_valid_email(e) {
                return Err(AppError::BadRequest(format!("Invalid email address: {}", e)));
            }
        }

        let budget = match req.budget {
            Some(b) if b > MAX_BUDGET => {
                return Err(AppError::BadRequest(format!(
                    "Budget {} exceeds the maximum of {}",
                    b, MAX_BUDGET
                )))
            }
            Some(b) if b.is_finite() && b > 0.0 => Decimal::from_f64(b)
                .ok_or_else(|| AppError::BadRequest(format!("Budget out of range: {}", b)))?
                .round_dp(2),
            Some(b) if !b.is_finite() => {
                return Err(AppError::BadRequest("Budget must be a finite number".to_string()))
            }
            _ => Decimal::ZERO,
        };

        Ok(Lead {
            id: clean(req.id).unwrap_or_else(|| format!("lead-{}", uuid::Uuid::new_v4())),
            name,
            company: clean(req.company).unwrap_or_default(),
            business_type: clean(req.business_type).unwrap_or_default(),
            budget,
            timeline: clean(req.timeline).unwrap_or_default(),
            requirements: clean(req.requirements).unwrap_or_default(),
            pain_points: req
                .pain_points
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            contact_info: ContactInfo {
                email,
                phone,
                website: clean(req.contact_info.website),
            },
        })
    }
}

// ============ Scoring outputs ============

/// Qualification bucket derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Cold,
    Nurture,
    Warm,
    Hot,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Hot, Tier::Warm, Tier::Nurture, Tier::Cold];

    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Tier::Hot,
            60..=79 => Tier::Warm,
            40..=59 => Tier::Nurture,
            _ => Tier::Cold,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Hot => "🔥 HOT LEAD",
            Tier::Warm => "⚡ WARM LEAD",
            Tier::Nurture => "🌱 NURTURE LEAD",
            Tier::Cold => "❄️ COLD LEAD",
        }
    }

    pub fn recommended_action(&self) -> &'static str {
        match self {
            Tier::Hot => "close immediately",
            Tier::Warm => "high priority, contact within 2 hours",
            Tier::Nurture => "send educational content",
            Tier::Cold => "long-term follow-up",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Hot => "HOT",
            Tier::Warm => "WARM",
            Tier::Nurture => "NURTURE",
            Tier::Cold => "COLD",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationVerdict {
    pub score: u8,
    pub tier: Tier,
    pub tier_label: String,
    /// One entry per rule that fired, in rule order.
    pub reasons: Vec<String>,
    pub recommended_action: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub estimated_value: Decimal,
    pub closing_probability: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealAction {
    CloseNow,
    Nurture,
    FollowUp,
}

/// Output of the weighted deal-probability model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealProbability {
    pub probability: u8,
    pub confidence: Confidence,
    pub recommended_action: DealAction,
    pub expected_timeline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadAssessment {
    pub verdict: QualificationVerdict,
    pub deal_probability: DealProbability,
}

// ============ Providers ============

/// External AI provider. The variant selects the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Gemini,
    DeepSeek,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [ProviderId::OpenAi, ProviderId::Gemini, ProviderId::DeepSeek];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Gemini => "gemini",
            ProviderId::DeepSeek => "deepseek",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAi),
            "gemini" => Ok(ProviderId::Gemini),
            "deepseek" => Ok(ProviderId::DeepSeek),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub provider: ProviderId,
    /// Overrides the client's configured model.
    #[serde(default)]
    pub model: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Require the reply to parse as JSON.
    #[serde(default)]
    pub expect_json: bool,
}

impl ProviderRequest {
    pub fn new(provider: ProviderId, prompt: impl Into<String>) -> Self {
        Self {
            provider,
            model: None,
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 4000,
            expect_json: false,
        }
    }

    pub fn json(mut self) -> Self {
        self.expect_json = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Outcome of one provider call. `content` is present iff SUCCESS, `error` iff FAILURE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    pub provider: ProviderId,
    pub status: ResultStatus,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub latency_ms: u64,
    /// Raw payload kept for diagnostics; never sent to callers.
    #[serde(skip)]
    pub raw_response: Option<String>,
}

impl ProviderResult {
    pub fn success(
        provider: ProviderId,
        model: impl Into<String>,
        content: String,
        structured: Option<serde_json::Value>,
        usage: Option<TokenUsage>,
        latency_ms: u64,
    ) -> Self {
        Self {
            provider,
            status: ResultStatus::Success,
            model: model.into(),
            content: Some(content),
            structured,
            error: None,
            usage,
            latency_ms,
            raw_response: None,
        }
    }

    pub fn failure(
        provider: ProviderId,
        model: impl Into<String>,
        error: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            provider,
            status: ResultStatus::Failure,
            model: model.into(),
            content: None,
            structured: None,
            error: Some(error.into()),
            usage: None,
            latency_ms,
            raw_response: None,
        }
    }

    pub fn with_raw_response(mut self, raw: Option<String>) -> Self {
        self.raw_response = raw;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

// ============ Content & artifacts ============

/// Content-generation task the orchestrator can run for a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTask {
    BrandVoice,
    VisualDesign,
    BusinessAutomation,
    MultilingualCommunication,
}

impl ContentTask {
    pub const ALL: [ContentTask; 4] = [
        ContentTask::BrandVoice,
        ContentTask::VisualDesign,
        ContentTask::BusinessAutomation,
        ContentTask::MultilingualCommunication,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentTask::BrandVoice => "brand_voice",
            ContentTask::VisualDesign => "visual_design",
            ContentTask::BusinessAutomation => "business_automation",
            ContentTask::MultilingualCommunication => "multilingual_communication",
        }
    }
}

impl fmt::Display for ContentTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionStatus {
    Complete,
    Partial,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub task: ContentTask,
    pub status: SectionStatus,
    pub provider_results: BTreeMap<ProviderId, ProviderResult>,
}

impl ContentSection {
    pub fn new(task: ContentTask, provider_results: BTreeMap<ProviderId, ProviderResult>) -> Self {
        let succeeded = provider_results.values().filter(|r| r.is_success()).count();
        let status = if succeeded == 0 {
            SectionStatus::Failed
        } else if succeeded == provider_results.len() {
            SectionStatus::Complete
        } else {
            SectionStatus::Partial
        };
        Self {
            task,
            status,
            provider_results,
        }
    }
}

/// Static commercial metadata attached to an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packaging {
    /// `None` when the budget calls for a custom solution.
    pub recommended_package: Option<String>,
    pub package_name: Option<String>,
    pub license_type: Option<String>,
    pub license_code: Option<String>,
    pub value_proposition: ValueProposition,
    pub implementation_plan: ImplementationPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueProposition {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    pub roi_percentage: u32,
    pub time_to_value: String,
    pub competitive_advantage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationPlan {
    pub timeline: String,
    pub phases: Vec<String>,
    pub team: String,
    pub support: String,
}

/// Final merged output of one qualification/composition run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeArtifact {
    pub artifact_id: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<QualificationVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_probability: Option<DealProbability>,
    pub content: Vec<ContentSection>,
    pub packaging: Packaging,
    pub generated_at: DateTime<Utc>,
}

/// One-level view of an artifact handed to downstream sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenedArtifact {
    pub artifact_id: String,
    pub subject: String,
    pub score: Option<u8>,
    pub tier: Option<Tier>,
    pub recommended_action: Option<String>,
    pub estimated_value: Option<f64>,
    pub closing_probability: Option<u8>,
    pub recommended_package: Option<String>,
    /// Successful provider text, one block per task and provider.
    pub text: String,
    pub generated_at: DateTime<Utc>,
}

impl CompositeArtifact {
    pub fn flatten(&self) -> FlattenedArtifact {
        use rust_decimal::prelude::ToPrimitive;

        let mut text = String::new();
        for section in &self.content {
            for (provider, result) in &section.provider_results {
                if let Some(ref content) = result.content {
                    if !text.is_empty() {
                        text.push_str("\n\n");
                    }
                    text.push_str(&format!("[{} / {}]\n{}", section.task, provider, content));
                }
            }
        }

        FlattenedArtifact {
            artifact_id: self.artifact_id.clone(),
            subject: self.subject.clone(),
            score: self.verdict.as_ref().map(|v| v.score),
            tier: self.verdict.as_ref().map(|v| v.tier),
            recommended_action: self.verdict.as_ref().map(|v| v.recommended_action.clone()),
            estimated_value: self
                .verdict
                .as_ref()
                .and_then(|v| v.estimated_value.to_f64()),
            closing_probability: self.verdict.as_ref().map(|v| v.closing_probability),
            recommended_package: self.packaging.recommended_package.clone(),
            text,
            generated_at: self.generated_at,
        }
    }
}
