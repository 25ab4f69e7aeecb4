use crate::catalog::{find_license, recommend_package};
use crate::errors::AppError;
use crate::fingerprint::artifact_id;
use crate::models::{
    CompositeArtifact, ContentSection, ImplementationPlan, Lead, LeadAssessment, Packaging,
    SectionStatus, ValueProposition,
};
use crate::repository::ArtifactRepository;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

/// Everything the composer merges into one artifact.
#[derive(Debug, Clone)]
pub struct CompositionInput {
    pub subject: String,
    pub lead: Option<Lead>,
    pub assessment: Option<LeadAssessment>,
    pub sections: Vec<ContentSection>,
}

/// Merges verdict, provider output and catalog metadata into a [`CompositeArtifact`].
#[derive(Clone)]
pub struct SolutionComposer {
    repository: ArtifactRepository,
}

impl SolutionComposer {
    pub fn new(repository: ArtifactRepository) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &ArtifactRepository {
        &self.repository
    }

    /// Builds the artifact without recording it. Identical inputs give
    /// identical artifacts apart from `generated_at`.
    pub fn build(
        &self,
        input: &CompositionInput,
        generated_at: DateTime<Utc>,
    ) -> Result<CompositeArtifact, AppError> {
        let budget = input
            .lead
            .as_ref()
            .map(|l| l.budget)
            .unwrap_or(Decimal::ZERO);
        let packaging = packaging_for(budget);

        let fingerprint_source = json!({
            "subject": input.subject,
            "lead_id": input.lead.as_ref().map(|l| l.id.as_str()),
            "verdict": serde_json::to_value(input.assessment.as_ref().map(|a| &a.verdict))?,
            "deal_probability": serde_json::to_value(
                input.assessment.as_ref().map(|a| &a.deal_probability)
            )?,
            "content": serde_json::to_value(&input.sections)?,
            "packaging": serde_json::to_value(&packaging)?,
        });

        Ok(CompositeArtifact {
            artifact_id: artifact_id(&fingerprint_source),
            subject: input.subject.clone(),
            verdict: input.assessment.as_ref().map(|a| a.verdict.clone()),
            deal_probability: input.assessment.as_ref().map(|a| a.deal_probability.clone()),
            content: input.sections.clone(),
            packaging,
            generated_at,
        })
    }

    /// Builds the artifact and records it in the repository.
    ///
    /// Provider outages never fail composition; failed sections are kept
    /// with their FAILURE results.
    pub async fn compose(
        &self,
        input: CompositionInput,
    ) -> Result<Arc<CompositeArtifact>, AppError> {
        let artifact = self.build(&input, Utc::now())?;

        let failed = artifact
            .content
            .iter()
            .filter(|s| s.status == SectionStatus::Failed)
            .count();
        if !artifact.content.is_empty() && failed == artifact.content.len() {
            tracing::warn!(
                "⚠️  Artifact {} for {} has no successful provider content",
                artifact.artifact_id,
                artifact.subject
            );
        }

        tracing::info!(
            "✓ Composed artifact {} for {} ({} section(s), {} failed)",
            artifact.artifact_id,
            artifact.subject,
            artifact.content.len(),
            failed
        );

        Ok(self.repository.store(artifact).await)
    }
}

fn packaging_for(budget: Decimal) -> Packaging {
    let package = recommend_package(budget);
    let license = package.and_then(|p| find_license(p.license));

    Packaging {
        recommended_package: package.map(|p| p.id.to_string()),
        package_name: package.map(|p| p.name.to_string()),
        license_type: license.map(|l| l.name.to_string()),
        license_code: license.map(|l| l.code.to_string()),
        value_proposition: ValueProposition {
            total_value: budget.saturating_mul(Decimal::new(18, 1)),
            roi_percentage: 80,
            time_to_value: "4-6 weeks".to_string(),
            competitive_advantage:
                "Comprehensive AI transformation with Hip-Hop culture integration".to_string(),
        },
        implementation_plan: ImplementationPlan {
            timeline: "4-6 weeks".to_string(),
            phases: [
                "Week 1: Brand voice and visual design",
                "Week 2: Business automation setup",
                "Week 3: Multilingual communication",
                "Week 4: Integration and testing",
                "Week 5: Training and deployment",
                "Week 6: Optimization and scaling",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            team: "9LMNTS AI specialists + client team".to_string(),
            support: "24/7 AI monitoring + dedicated account manager".to_string(),
        },
    }
}
