//! Lead qualification.
//!
//! Two independent heuristics live here: the additive rule score that
//! produces a [`QualificationVerdict`], and the weighted deal-probability
//! model. Both are pure and deterministic.

use crate::models::{
    Confidence, DealAction, DealProbability, Lead, LeadAssessment, QualificationVerdict, Tier,
};
use rust_decimal::Decimal;

const URGENCY_KEYWORDS: &[&str] = &["urgent", "asap", "immediate", "24 hours"];
const HIGH_VALUE_TYPES: &[&str] = &[
    "e-commerce",
    "saas",
    "digital agency",
    "online business",
    "tech startup",
];
const PAIN_KEYWORDS: &[&str] = &[
    "outdated",
    "manual",
    "inefficient",
    "slow",
    "expensive",
    "time-consuming",
];

const MAX_CLOSING_PROBABILITY: u8 = 95;

/// A single independent scoring rule. Returns the points and reason when it fires.
#[derive(Clone, Copy)]
pub struct ScoringRule {
    pub name: &'static str,
    pub evaluate: fn(&Lead) -> Option<(u8, &'static str)>,
}

impl std::fmt::Debug for ScoringRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringRule").field("name", &self.name).finish()
    }
}

/// Rules in canonical order; `reasons` follow this order.
pub const RULES: [ScoringRule; 4] = [
    ScoringRule {
        name: "budget",
        evaluate: budget_rule,
    },
    ScoringRule {
        name: "urgency",
        evaluate: urgency_rule,
    },
    ScoringRule {
        name: "business_type",
        evaluate: business_type_rule,
    },
    ScoringRule {
        name: "pain_points",
        evaluate: pain_rule,
    },
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|n| haystack.contains(n))
}

// Bands are exclusive: 5000+ gives 30, [2000, 5000) gives 40.
fn budget_rule(lead: &Lead) -> Option<(u8, &'static str)> {
    if lead.budget >= Decimal::from(5000) {
        Some((30, "High budget for full transformation"))
    } else if lead.budget >= Decimal::from(2000) {
        Some((40, "Meets minimum budget requirement"))
    } else {
        None
    }
}

fn urgency_rule(lead: &Lead) -> Option<(u8, &'static str)> {
    contains_any(&lead.timeline, URGENCY_KEYWORDS).then_some((20, "Urgent timeline"))
}

fn business_type_rule(lead: &Lead) -> Option<(u8, &'static str)> {
    contains_any(&lead.business_type, HIGH_VALUE_TYPES).then_some((15, "High-value business type"))
}

fn pain_rule(lead: &Lead) -> Option<(u8, &'static str)> {
    contains_any(&lead.pain_text(), PAIN_KEYWORDS).then_some((25, "Automation opportunity"))
}

/// Scores `lead` against an arbitrary rule list.
///
/// Contributions are summed and clamped to 100, so the total does not
/// depend on rule order. Reasons are listed in the order given.
pub fn score_with_rules(lead: &Lead, rules: &[ScoringRule]) -> QualificationVerdict {
    let mut total: u32 = 0;
    let mut reasons = Vec::new();

    for rule in rules {
        if let Some((points, reason)) = (rule.evaluate)(lead) {
            total += u32::from(points);
            reasons.push(reason.to_string());
        }
    }

    let score = total.min(100) as u8;
    let tier = Tier::from_score(score);

    QualificationVerdict {
        score,
        tier,
        tier_label: tier.label().to_string(),
        reasons,
        recommended_action: tier.recommended_action().to_string(),
        estimated_value: lead.budget.saturating_mul(Decimal::new(18, 1)),
        closing_probability: score.min(MAX_CLOSING_PROBABILITY),
    }
}

/// Scoring entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, lead: &Lead) -> QualificationVerdict {
        let verdict = score_with_rules(lead, &RULES);
        tracing::debug!(
            "Scored lead {}: {} ({}), reasons={:?}",
            lead.id,
            verdict.score,
            verdict.tier,
            verdict.reasons
        );
        verdict
    }

    /// Weighted deal-probability model, independent of [`ScoringEngine::score`].
    pub fn deal_probability(&self, lead: &Lead) -> DealProbability {
        let budget_alignment = if lead.budget >= Decimal::from(5000) {
            100.0
        } else if lead.budget >= Decimal::from(2000) {
            70.0
        } else if lead.budget >= Decimal::from(1000) {
            40.0
        } else {
            0.0
        };
        let urgency = if contains_any(&lead.timeline, &["urgent", "asap", "immediate"]) {
            100.0
        } else {
            0.0
        };
        let business_fit = if contains_any(
            &lead.business_type,
            &["e-commerce", "saas", "digital", "tech", "online"],
        ) {
            100.0
        } else {
            0.0
        };
        let pain_signal = if contains_any(
            &lead.pain_text(),
            &["manual", "slow", "expensive", "inefficient", "outdated"],
        ) {
            100.0
        } else {
            0.0
        };
        let competitive_pressure = 50.0;

        let weighted: f64 = budget_alignment * 0.30
            + urgency * 0.25
            + business_fit * 0.20
            + pain_signal * 0.15
            + competitive_pressure * 0.10;

        let probability = (weighted.round() as u8).min(MAX_CLOSING_PROBABILITY);

        let confidence = match probability {
            70.. => Confidence::High,
            50..=69 => Confidence::Medium,
            _ => Confidence::Low,
        };
        let (recommended_action, expected_timeline) = match probability {
            80.. => (DealAction::CloseNow, "24 hours"),
            60..=79 => (DealAction::Nurture, "2-3 days"),
            _ => (DealAction::FollowUp, "1 week"),
        };

        DealProbability {
            probability,
            confidence,
            recommended_action,
            expected_timeline: expected_timeline.to_string(),
        }
    }

    pub fn assess(&self, lead: &Lead) -> LeadAssessment {
        LeadAssessment {
            verdict: self.score(lead),
            deal_probability: self.deal_probability(lead),
        }
    }
}
