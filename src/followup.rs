use crate::models::{Lead, Tier};

const HOT_TEMPLATE: &str = "🚀 FOLLOW-UP: Your AI Transformation is Ready!

Hi {name},

Following up on {company}'s AI transformation. Based on your requirements, \
the AI Brand Transformation Package ($5,000) is the fastest path to results.

We can start this week. Reply to book your kickoff call.";

const WARM_TEMPLATE: &str = "📈 FOLLOW-UP: Scale Your Business with AI

Hi {name},

{company} is a great fit for AI automation. Our packages start at $2,000 \
and pay for themselves within months.

Do you have 15 minutes this week for a quick call?";

const NURTURE_TEMPLATE: &str = "💡 AI INSIGHT: Transform Your Industry

Hi {name},

Similar {industry} companies are seeing 300% ROI in 6 months with AI-powered \
brand and automation systems.

When the timing is right for {company}, we are here to help.";

fn template_for(tier: Tier) -> &'static str {
    match tier {
        Tier::Hot => HOT_TEMPLATE,
        Tier::Warm => WARM_TEMPLATE,
        Tier::Nurture | Tier::Cold => NURTURE_TEMPLATE,
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed
    }
}

/// Stage follow-up message for a lead, personalised with its name,
/// company and business type.
pub fn followup_message(tier: Tier, lead: &Lead) -> String {
    template_for(tier)
        .replace("{name}", or_default(&lead.name, "there"))
        .replace("{company}", or_default(&lead.company, "your company"))
        .replace("{industry}", or_default(&lead.business_type, "your industry"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContactInfo;
    use rust_decimal::Decimal;

    fn lead(name: &str, company: &str, business_type: &str) -> Lead {
        Lead {
            id: "lead-test".to_string(),
            name: name.to_string(),
            company: company.to_string(),
            business_type: business_type.to_string(),
            budget: Decimal::ZERO,
            timeline: String::new(),
            requirements: String::new(),
            pain_points: vec![],
            contact_info: ContactInfo::default(),
        }
    }

    #[test]
    fn test_hot_followup_personalised() {
        let msg = followup_message(Tier::Hot, &lead("Ana", "Acme", "saas"));
        assert!(msg.starts_with("🚀 FOLLOW-UP"));
        assert!(msg.contains("Hi Ana,"));
        assert!(msg.contains("Acme's AI transformation"));
        assert!(msg.contains("$5,000"));
    }

    #[test]
    fn test_warm_followup_mentions_entry_price() {
        let msg = followup_message(Tier::Warm, &lead("Ana", "Acme", "saas"));
        assert!(msg.contains("start at $2,000"));
        assert!(msg.contains("15 minutes"));
    }

    #[test]
    fn test_cold_uses_nurture_template() {
        let l = lead("Ana", "Acme", "retail");
        assert_eq!(
            followup_message(Tier::Cold, &l),
            followup_message(Tier::Nurture, &l)
        );
        assert!(followup_message(Tier::Cold, &l).contains("Similar retail companies"));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let msg = followup_message(Tier::Nurture, &lead("  ", "", ""));
        assert!(msg.contains("Hi there,"));
        assert!(msg.contains("Similar your industry companies"));
        assert!(msg.contains("right for your company"));
        assert!(!msg.contains('{'));
    }
}
