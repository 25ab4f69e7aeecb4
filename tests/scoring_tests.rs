/// Scoring scenarios for lead qualification and deal probability
use rust_decimal::Decimal;
use rust_loa_api::models::{Confidence, ContactInfo, DealAction, Lead, LeadRequest, Tier};
use rust_loa_api::scoring::ScoringEngine;

fn lead(budget: i64, timeline: &str, business_type: &str, requirements: &str) -> Lead {
    Lead {
        id: "lead-scenario".to_string(),
        name: "Scenario".to_string(),
        company: "Scenario Co".to_string(),
        business_type: business_type.to_string(),
        budget: Decimal::from(budget),
        timeline: timeline.to_string(),
        requirements: requirements.to_string(),
        pain_points: vec![],
        contact_info: ContactInfo {
            email: Some("owner@scenario.example".to_string()),
            ..Default::default()
        },
    }
}

#[test]
fn test_hot_lead_scenario() {
    let l = lead(5000, "urgent", "e-commerce", "manual processes");
    let verdict = ScoringEngine::new().score(&l);

    assert_eq!(verdict.score, 90);
    assert_eq!(verdict.tier, Tier::Hot);
    assert_eq!(verdict.closing_probability, 90);
    assert_eq!(verdict.estimated_value, Decimal::from(9000));
    assert_eq!(verdict.recommended_action, "close immediately");
    assert_eq!(verdict.reasons.len(), 4);
}

#[test]
fn test_cold_lead_scenario() {
    let l = lead(500, "next quarter", "retail shop", "looking for ideas");
    let verdict = ScoringEngine::new().score(&l);

    assert_eq!(verdict.score, 0);
    assert_eq!(verdict.tier, Tier::Cold);
    assert!(verdict.reasons.is_empty());
    assert_eq!(verdict.closing_probability, 0);
    assert_eq!(verdict.recommended_action, "long-term follow-up");
}

#[test]
fn test_budget_rule_contributions() {
    let engine = ScoringEngine::new();
    let budget_only = |b: i64| engine.score(&lead(b, "", "", "")).score;

    assert_eq!(budget_only(1999), 0);
    assert_eq!(budget_only(2000), 40);
    assert_eq!(budget_only(4999), 40);
    assert_eq!(budget_only(5000), 30);
    assert_eq!(budget_only(250_000), 30);
}

#[test]
fn test_warm_lead_from_validated_request() {
    let request: LeadRequest = serde_json::from_value(serde_json::json!({
        "name": "Marco",
        "company": "Bytecraft",
        "business_type": "Tech Startup",
        "budget": 3000,
        "timeline": "flexible",
        "contact_info": {"phone": "+44 20 7946 0000"}
    }))
    .unwrap();
    let l = Lead::try_from(request).unwrap();
    let verdict = ScoringEngine::new().score(&l);

    // 40 budget + 15 business type
    assert_eq!(verdict.score, 55);
    assert_eq!(verdict.tier, Tier::Nurture);
    assert_eq!(verdict.estimated_value, Decimal::from(5400));
}

#[test]
fn test_deal_probability_scenario() {
    let l = lead(2500, "asap", "saas", "");
    let p = ScoringEngine::new().deal_probability(&l);

    // 70*0.3 + 100*0.25 + 100*0.2 + 0 + 50*0.1 = 71
    assert_eq!(p.probability, 71);
    assert_eq!(p.confidence, Confidence::High);
    assert_eq!(p.recommended_action, DealAction::Nurture);
    assert_eq!(p.expected_timeline, "2-3 days");
}

#[test]
fn test_assess_returns_both_models() {
    let l = lead(5000, "urgent", "e-commerce", "manual processes");
    let assessment = ScoringEngine::new().assess(&l);

    assert_eq!(assessment.verdict.score, 90);
    // 30 + 25 + 20 + 15 + 5
    assert_eq!(assessment.deal_probability.probability, 95);
}
