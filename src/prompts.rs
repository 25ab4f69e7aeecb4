use crate::config::Config;
use crate::errors::AppError;
use crate::models::{ContentTask, Lead, ProviderId, ProviderRequest};
use crate::orchestrator::{PlanStep, TaskPlan};
use serde::Deserialize;

/// Optional creative brief sent alongside a lead.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BriefDetails {
    pub target_audience: String,
    pub brand_values: Vec<String>,
    pub color_preferences: String,
    pub style_preferences: String,
    pub current_processes: String,
    pub target_markets: Vec<String>,
    pub content_types: Vec<String>,
}

impl Default for BriefDetails {
    fn default() -> Self {
        Self {
            target_audience: "general market".to_string(),
            brand_values: Vec::new(),
            color_preferences: "no preference".to_string(),
            style_preferences: "modern".to_string(),
            current_processes: String::new(),
            target_markets: vec!["US".to_string(), "Europe".to_string()],
            content_types: vec!["marketing".to_string(), "support".to_string()],
        }
    }
}

/// Which provider gets which half of a task, and the generation defaults.
#[derive(Debug, Clone, Copy)]
pub struct Routing {
    /// Receives the structured prompt and must answer in JSON.
    pub primary: ProviderId,
    /// Receives the narrative prompt.
    pub secondary: ProviderId,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Routing {
    pub fn from_config(config: &Config) -> Self {
        Self {
            primary: config.primary_provider,
            secondary: config.secondary_provider,
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    fn request(&self, provider: ProviderId, prompt: String) -> ProviderRequest {
        ProviderRequest {
            provider,
            model: None,
            prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            expect_json: false,
        }
    }
}

fn or_unspecified(value: &str) -> &str {
    if value.is_empty() {
        "unspecified"
    } else {
        value
    }
}

fn list(values: &[String]) -> String {
    if values.is_empty() {
        "unspecified".to_string()
    } else {
        values.join(", ")
    }
}

/// Builds the two-step plan for one task.
///
/// Brand voice is the only task whose secondary step waits for the primary:
/// the cultural adaptation is written against the generated voice.
pub fn plan_for(
    task: ContentTask,
    lead: &Lead,
    brief: &BriefDetails,
    routing: &Routing,
) -> Result<TaskPlan, AppError> {
    let company = if lead.company.is_empty() {
        lead.name.as_str()
    } else {
        lead.company.as_str()
    };
    let industry = or_unspecified(&lead.business_type);

    let (structured, narrative) = match task {
        ContentTask::BrandVoice => (
            format!(
                "Create a comprehensive brand voice personality for {company}, a {industry} company targeting {audience}.\n\n\
                 Brand values: {values}\n\n\
                 Provide:\n\
                 1. Brand personality traits (5-7 key characteristics)\n\
                 2. Tone of voice guidelines\n\
                 3. Communication style preferences\n\
                 4. Language patterns and vocabulary\n\
                 5. Emotional connection strategy\n\
                 6. Content creation guidelines\n\
                 7. Social media voice adaptation\n\n\
                 Format as structured JSON.",
                audience = brief.target_audience,
                values = list(&brief.brand_values),
            ),
            format!(
                "Analyze the brand voice for {company} and provide cultural adaptation strategies for:\n\
                 1. Global markets ({markets})\n\
                 2. Different demographic groups\n\
                 3. Cultural sensitivity considerations\n\
                 4. Localization strategies\n\
                 5. Multilingual communication patterns\n\n\
                 Company: {company}\nIndustry: {industry}\nTarget: {audience}\n\n\
                 Provide actionable cultural adaptation guidelines.",
                markets = list(&brief.target_markets),
                audience = brief.target_audience,
            ),
        ),
        ContentTask::VisualDesign => (
            format!(
                "Generate a comprehensive visual design system for {company} in the {industry} industry.\n\n\
                 Preferences: {style}\nColors: {colors}\n\n\
                 Provide:\n\
                 1. Logo design concepts (3 variations)\n\
                 2. Color palette (primary, secondary, accent colors)\n\
                 3. Typography system (headings, body, accent fonts)\n\
                 4. Icon design guidelines\n\
                 5. Layout and composition principles\n\
                 6. Brand application examples\n\n\
                 Format as structured JSON for immediate implementation.",
                style = brief.style_preferences,
                colors = brief.color_preferences,
            ),
            format!(
                "Analyze current design trends for {industry} brands and provide:\n\
                 1. Trending visual elements\n\
                 2. Competitor design analysis\n\
                 3. Differentiation opportunities\n\
                 4. Future-proof design considerations\n\n\
                 Brand: {company}\nIndustry: {industry}"
            ),
        ),
        ContentTask::BusinessAutomation => {
            let processes = or_unspecified(&brief.current_processes);
            let pains = or_unspecified(&lead.pain_text()).to_string();
            (
                format!(
                    "Analyze {company} ({industry}) and design comprehensive AI automation workflows.\n\n\
                     Current processes: {processes}\nPain points: {pains}\n\n\
                     Provide:\n\
                     1. Process automation opportunities\n\
                     2. AI workflow designs\n\
                     3. Integration requirements\n\
                     4. Implementation timeline\n\
                     5. ROI calculations\n\
                     6. Risk mitigation strategies\n\n\
                     Format as structured JSON."
                ),
                format!(
                    "Recommend an AI technology stack for {company} automation:\n\n\
                     Business type: {industry}\nProcesses: {processes}\nChallenges: {pains}\n\n\
                     Provide:\n\
                     1. AI tools and platforms\n\
                     2. Integration architecture\n\
                     3. Data requirements\n\
                     4. Security considerations\n\
                     5. Cost analysis"
                ),
            )
        }
        ContentTask::MultilingualCommunication => {
            let markets = list(&brief.target_markets);
            let content_types = list(&brief.content_types);
            (
                format!(
                    "Design a comprehensive multilingual communication strategy for {company}.\n\n\
                     Target markets: {markets}\nContent types: {content_types}\n\n\
                     Provide:\n\
                     1. Language prioritization\n\
                     2. Cultural adaptation strategies\n\
                     3. Content localization frameworks\n\
                     4. AI translation workflows\n\
                     5. Quality assurance processes\n\
                     6. Market-specific messaging\n\n\
                     Format as structured JSON."
                ),
                format!(
                    "Analyze cultural communication patterns for {markets}:\n\n\
                     Business: {company}\nContent types: {content_types}\n\n\
                     Provide:\n\
                     1. Cultural communication preferences\n\
                     2. Market-specific nuances\n\
                     3. Local business etiquette\n\
                     4. Regulatory considerations\n\
                     5. Platform preferences\n\
                     6. Timing and frequency optimization"
                ),
            )
        }
    };

    let primary = PlanStep::independent(routing.request(routing.primary, structured).json());
    let secondary_request = routing.request(routing.secondary, narrative);
    let secondary = match task {
        ContentTask::BrandVoice => PlanStep::after(secondary_request, routing.primary),
        _ => PlanStep::independent(secondary_request),
    };

    TaskPlan::new(task, vec![primary, secondary])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContactInfo;
    use rust_decimal::Decimal;

    fn lead() -> Lead {
        Lead {
            id: "lead-1".to_string(),
            name: "Ana".to_string(),
            company: "Shopline".to_string(),
            business_type: "e-commerce".to_string(),
            budget: Decimal::from(5000),
            timeline: "urgent".to_string(),
            requirements: "manual order entry".to_string(),
            pain_points: vec![],
            contact_info: ContactInfo::default(),
        }
    }

    fn routing() -> Routing {
        Routing {
            primary: ProviderId::OpenAi,
            secondary: ProviderId::Gemini,
            temperature: 0.7,
            max_tokens: 4000,
        }
    }

    #[test]
    fn test_brand_voice_secondary_depends_on_primary() {
        let plan = plan_for(ContentTask::BrandVoice, &lead(), &BriefDetails::default(), &routing())
            .unwrap();
        let steps = plan.steps();
        assert_eq!(steps.len(), 2);
        assert!(steps[0].request.expect_json);
        assert_eq!(steps[0].request.provider, ProviderId::OpenAi);
        assert_eq!(steps[1].depends_on, Some(ProviderId::OpenAi));
        assert!(steps[0].request.prompt.contains("Shopline"));
    }

    #[test]
    fn test_other_tasks_are_independent() {
        for task in [
            ContentTask::VisualDesign,
            ContentTask::BusinessAutomation,
            ContentTask::MultilingualCommunication,
        ] {
            let plan = plan_for(task, &lead(), &BriefDetails::default(), &routing()).unwrap();
            assert!(plan.steps().iter().all(|s| s.depends_on.is_none()));
        }
    }

    #[test]
    fn test_automation_prompt_mentions_pain_points() {
        let plan = plan_for(
            ContentTask::BusinessAutomation,
            &lead(),
            &BriefDetails::default(),
            &routing(),
        )
        .unwrap();
        assert!(plan.steps()[0].request.prompt.contains("manual order entry"));
    }

    #[test]
    fn test_same_provider_routing_rejected() {
        let mut r = routing();
        r.secondary = ProviderId::OpenAi;
        assert!(plan_for(ContentTask::VisualDesign, &lead(), &BriefDetails::default(), &r).is_err());
    }
}
