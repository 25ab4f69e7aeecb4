//! Static commercial catalog: Nine Pillars services, sales packages,
//! Event OS license types and public pricing tiers.

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct Service {
    pub id: &'static str,
    pub name: &'static str,
    pub element: &'static str,
    pub description: &'static str,
    pub ai_capability: &'static str,
    pub base_price: u32,
}

#[derive(Debug, Serialize)]
pub struct Package {
    pub id: &'static str,
    pub name: &'static str,
    pub price: u32,
    pub value: u32,
    pub services: &'static [&'static str],
    /// Key into [`LICENSE_TYPES`].
    pub license: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LicenseType {
    pub key: &'static str,
    pub name: &'static str,
    pub code: &'static str,
    pub duration: &'static str,
    pub scope: &'static str,
    pub protections: &'static [&'static str],
    pub restrictions: &'static [&'static str],
    #[serde(skip)]
    pub market_value: u32,
    #[serde(skip)]
    pub client_roi: u32,
    #[serde(skip)]
    pub protection_level: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PricingTier {
    pub id: &'static str,
    pub name: &'static str,
    /// `None` for custom-quoted work.
    pub price: Option<u32>,
    pub audience: &'static str,
    pub features: &'static [&'static str],
}

pub static SERVICES: [Service; 9] = [
    Service {
        id: "mcing_element",
        name: "AI Brand Voice",
        element: "MCing",
        description: "Brand voice and messaging strategy that speaks to your audience with authentic rhythm",
        ai_capability: "Custom GPT brand personality and tone guidelines",
        base_price: 2500,
    },
    Service {
        id: "djing_element",
        name: "AI User Experience",
        element: "DJing",
        description: "Mixing user experience flows to create seamless digital journeys",
        ai_capability: "Journey analytics and flow optimization",
        base_price: 3000,
    },
    Service {
        id: "graffiti_element",
        name: "AI Visual Design",
        element: "Graffiti",
        description: "Bold visual design and brand identity that makes your mark on the digital landscape",
        ai_capability: "Generated logo concepts, palettes and typography systems",
        base_price: 2500,
    },
    Service {
        id: "breaking_element",
        name: "AI Innovation Disruption",
        element: "Breaking",
        description: "Breaking conventional design patterns with innovative UI/UX solutions",
        ai_capability: "Competitive pattern analysis and concept generation",
        base_price: 3500,
    },
    Service {
        id: "beatboxing_element",
        name: "AI Interaction Animation",
        element: "Beatboxing",
        description: "Creating rhythmic interactions and animations that bring your site to life",
        ai_capability: "Motion design generation",
        base_price: 2000,
    },
    Service {
        id: "knowledge_element",
        name: "AI Content Learning",
        element: "Knowledge",
        description: "Content strategy and information architecture that educates and engages",
        ai_capability: "Automated content pipelines",
        base_price: 2000,
    },
    Service {
        id: "fashion_element",
        name: "AI Trend Forecasting",
        element: "Fashion",
        description: "Trendsetting design aesthetics that keep your brand ahead of the curve",
        ai_capability: "Market trend analysis",
        base_price: 1500,
    },
    Service {
        id: "entrepreneurship_element",
        name: "AI Business Automation",
        element: "Entrepreneurship",
        description: "Full-stack development and technical solutions for your business growth",
        ai_capability: "Workflow automation and AI integration",
        base_price: 5000,
    },
    Service {
        id: "language_element",
        name: "AI Multilingual Communication",
        element: "Language",
        description: "Multi-platform design language systems for consistent brand expression",
        ai_capability: "Translation workflows and cultural adaptation",
        base_price: 2500,
    },
];

pub static PACKAGES: [Package; 3] = [
    Package {
        id: "ai_brand_transformation",
        name: "AI Brand Transformation",
        price: 5000,
        value: 9000,
        services: &["mcing_element", "graffiti_element", "language_element"],
        license: "ai_brand_transformation",
    },
    Package {
        id: "digital_dominance_starter",
        name: "Digital Dominance Starter",
        price: 7500,
        value: 13500,
        services: &[
            "mcing_element",
            "djing_element",
            "graffiti_element",
            "knowledge_element",
            "entrepreneurship_element",
        ],
        license: "digital_dominance",
    },
    Package {
        id: "ai_business_empire",
        name: "AI Business Empire",
        price: 15000,
        value: 27000,
        services: &[
            "mcing_element",
            "djing_element",
            "graffiti_element",
            "breaking_element",
            "beatboxing_element",
            "knowledge_element",
            "fashion_element",
            "entrepreneurship_element",
            "language_element",
        ],
        license: "ai_business_empire",
    },
];

pub static LICENSE_TYPES: [LicenseType; 3] = [
    LicenseType {
        key: "ai_brand_transformation",
        name: "AI Brand Transformation License",
        code: "EVT-OS-BT-2025",
        duration: "perpetual",
        scope: "global",
        protections: &[
            "Custom GPT model ownership",
            "AI-generated brand voice rights",
            "Automated content IP",
            "Visual design system variations",
            "Multilingual communication assets",
        ],
        restrictions: &[
            "No resale of core AI models",
            "Attribution required for derivative works",
            "Commercial use unlimited",
        ],
        market_value: 15000,
        client_roi: 9000,
        protection_level: "Standard",
    },
    LicenseType {
        key: "digital_dominance",
        name: "Digital Dominance License",
        code: "EVT-OS-DD-2025",
        duration: "perpetual",
        scope: "global",
        protections: &[
            "AI automation workflows",
            "UX optimization systems",
            "Content generation pipelines",
            "Business process IP",
        ],
        restrictions: &[
            "Workflow redistribution restricted",
            "System architecture confidential",
            "Commercial use unlimited",
        ],
        market_value: 25000,
        client_roi: 17500,
        protection_level: "Professional",
    },
    LicenseType {
        key: "ai_business_empire",
        name: "AI Business Empire License",
        code: "EVT-OS-BE-2025",
        duration: "perpetual",
        scope: "global",
        protections: &[
            "Enterprise AI systems",
            "Custom automation solutions",
            "Business intelligence IP",
            "Scalable architecture rights",
        ],
        restrictions: &[
            "No competitor transfer",
            "Source code protection",
            "Enterprise use unlimited",
        ],
        market_value: 50000,
        client_roi: 35000,
        protection_level: "Enterprise",
    },
];

const LICENSE_TERMS: [(&str, &str); 6] = [
    ("ownership", "Client owns 100% of delivered AI assets and custom models"),
    ("exclusivity", "9LMNTS cannot resell client-specific customizations"),
    ("support", "Lifetime updates and maintenance included"),
    ("attribution", "9LMNTS attribution optional for marketing materials"),
    ("transferability", "Full IP rights transferable to business successors"),
    ("protection", "Legal protection against IP infringement included"),
];

pub static PRICING_TIERS: [PricingTier; 4] = [
    PricingTier {
        id: "basic",
        name: "Basic Boost",
        price: Some(1500),
        audience: "Startups/Small Projects",
        features: &[
            "Initial Concept",
            "1 Revision Round",
            "Basic Mockups",
            "Mobile Responsive",
            "Basic Design Assets",
            "1-2 Week Delivery",
        ],
    },
    PricingTier {
        id: "standard",
        name: "Standard Pro",
        price: Some(3000),
        audience: "Growing Businesses",
        features: &[
            "Everything in Basic Boost",
            "Full Wireframe",
            "2 Revision Rounds",
            "Full Design System Overview",
            "Component Library",
            "Interactive Prototype",
            "2-3 Week Delivery",
        ],
    },
    PricingTier {
        id: "premium",
        name: "Premium Elite",
        price: Some(5000),
        audience: "Established Brands",
        features: &[
            "Everything in Standard Pro",
            "Full UX Research",
            "Unlimited Revisions",
            "Full Design System Documentation",
            "Advanced Animations",
            "Priority Support",
            "Developer Handoff",
            "Style Guide",
            "3-4 Week Delivery",
        ],
    },
    PricingTier {
        id: "custom",
        name: "Custom Scale",
        price: None,
        audience: "High-End/Large Scope",
        features: &[
            "Large-scale Applications",
            "Full Brand Overhaul",
            "Retainer Work Available",
        ],
    },
];

pub fn find_service(id: &str) -> Option<&'static Service> {
    SERVICES.iter().find(|s| s.id == id)
}

pub fn find_package(id: &str) -> Option<&'static Package> {
    PACKAGES.iter().find(|p| p.id == id)
}

/// Looks up a license type by its own key or by the id of a package that carries it.
pub fn find_license(key: &str) -> Option<&'static LicenseType> {
    let key = find_package(key).map(|p| p.license).unwrap_or(key);
    LICENSE_TYPES.iter().find(|l| l.key == key)
}

/// Largest package the budget covers; `None` means a custom solution.
pub fn recommend_package(budget: Decimal) -> Option<&'static Package> {
    PACKAGES
        .iter()
        .rev()
        .find(|p| budget >= Decimal::from(p.price))
}

#[derive(Debug, Clone, Serialize)]
pub struct Proposal {
    pub package_id: &'static str,
    pub package_name: &'static str,
    pub price: u32,
    pub value: u32,
    pub roi: String,
    pub roi_percentage: f64,
    pub services: Vec<&'static Service>,
    pub timeline: &'static str,
    pub event_os_license: &'static str,
    pub payment_terms: &'static str,
    pub guarantee: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_requirements: Option<String>,
}

pub fn build_proposal(
    package_id: &str,
    client_requirements: Option<String>,
) -> Result<Proposal, AppError> {
    let package = find_package(package_id)
        .ok_or_else(|| AppError::NotFound(format!("Package not found: {}", package_id)))?;

    let roi_percentage =
        (f64::from(package.value) - f64::from(package.price)) / f64::from(package.price) * 100.0;

    let services = package
        .services
        .iter()
        .filter_map(|id| find_service(id))
        .collect();

    let license = find_license(package.license)
        .map(|l| l.code)
        .unwrap_or("Included");

    Ok(Proposal {
        package_id: package.id,
        package_name: package.name,
        price: package.price,
        value: package.value,
        roi: format!("{:.1}%", roi_percentage),
        roi_percentage,
        services,
        timeline: "24-48 hours",
        event_os_license: license,
        payment_terms: "50% upfront, 50% on delivery",
        guarantee: "AI setup satisfaction guaranteed",
        client_requirements,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LicenseInfo {
    #[serde(rename = "type")]
    pub license_type: &'static str,
    pub code: &'static str,
    pub issue_date: DateTime<Utc>,
    pub duration: &'static str,
    pub scope: &'static str,
    pub auto_renewal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegalEnforcement {
    pub jurisdiction: &'static str,
    pub dispute_resolution: &'static str,
    pub infringement_penalty: &'static str,
    pub attorney_fees: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LicenseDocument {
    pub license_id: String,
    pub client_info: ClientInfo,
    pub license_info: LicenseInfo,
    pub license_key: &'static str,
    pub ip_protections: &'static [&'static str],
    pub usage_rights: &'static [&'static str],
    pub terms: BTreeMap<&'static str, &'static str>,
    pub legal_enforcement: LegalEnforcement,
    pub value: LicenseValue,
}

/// Builds an Event OS license for `client`. `key` is a license key or package id.
pub fn generate_license(
    client: ClientInfo,
    key: &str,
    issued_at: DateTime<Utc>,
) -> Result<LicenseDocument, AppError> {
    let license = find_license(key)
        .ok_or_else(|| AppError::NotFound(format!("Unknown service package: {}", key)))?;

    let name = if client.name.trim().is_empty() {
        "UNKNOWN"
    } else {
        client.name.trim()
    };
    let prefix: String = name.chars().take(3).collect::<String>().to_uppercase();
    let license_id = format!("{}-{}", license.code, prefix);

    tracing::info!("📋 Generated Event OS License: {} for {}", license_id, name);

    Ok(LicenseDocument {
        license_id,
        client_info: client,
        license_info: LicenseInfo {
            license_type: license.name,
            code: license.code,
            issue_date: issued_at,
            duration: license.duration,
            scope: license.scope,
            auto_renewal: true,
        },
        license_key: license.key,
        ip_protections: license.protections,
        usage_rights: license.restrictions,
        terms: LICENSE_TERMS.iter().copied().collect(),
        legal_enforcement: LegalEnforcement {
            jurisdiction: "International IP Law",
            dispute_resolution: "Arbitration",
            infringement_penalty: "3x project value + legal fees",
            attorney_fees: "Reimbursable if infringement proven",
        },
        value: value_of(license),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LicenseValue {
    pub market_value: u32,
    pub license_value: u32,
    pub total_roi: u32,
    pub protection_level: &'static str,
    pub value_proposition: String,
}

fn value_of(license: &LicenseType) -> LicenseValue {
    LicenseValue {
        market_value: license.market_value,
        license_value: 0,
        total_roi: license.client_roi,
        protection_level: license.protection_level,
        value_proposition: format!(
            "Protects ${} in AI IP value with lifetime enforcement",
            with_thousands(license.market_value)
        ),
    }
}

pub fn license_value(key: &str) -> Result<LicenseValue, AppError> {
    find_license(key)
        .map(value_of)
        .ok_or_else(|| AppError::NotFound(format!("Unknown service package: {}", key)))
}

/// How a licensee intends to use the delivered assets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UsageContext {
    pub geography: Option<String>,
    pub commercial: bool,
    pub no_attribution: bool,
    pub transfer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Violation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub license_id: String,
    pub compliance_score: u8,
    pub status: ComplianceStatus,
    pub violations: Vec<&'static str>,
    pub recommended_action: &'static str,
}

const GLOBAL_SCOPES: [&str; 3] = ["global", "worldwide", "any"];

/// Checks a usage context against a license's rights and terms.
///
/// Scoring starts at 100 and each violated clause deducts a fixed penalty.
/// An undeclared geography is treated as out of scope.
pub fn verify_compliance(license: &LicenseDocument, usage: &UsageContext) -> ComplianceReport {
    let mut score: u8 = 100;
    let mut violations = Vec::new();

    let term_contains = |key: &str, needle: &str| {
        license
            .terms
            .get(key)
            .is_some_and(|term| term.contains(needle))
    };

    let global = usage.geography.as_deref().is_some_and(|g| {
        GLOBAL_SCOPES
            .iter()
            .any(|scope| g.trim().eq_ignore_ascii_case(scope))
    });
    if !global {
        score = score.saturating_sub(20);
        violations.push("Geographic scope violation");
    }

    if usage.commercial
        && !license
            .usage_rights
            .iter()
            .any(|right| right.contains("Commercial use unlimited"))
    {
        score = score.saturating_sub(30);
        violations.push("Commercial use restriction");
    }

    if usage.no_attribution && !term_contains("attribution", "9LMNTS attribution optional") {
        score = score.saturating_sub(10);
        violations.push("Attribution requirement violation");
    }

    if usage.transfer && !term_contains("transferability", "Full IP rights transferable") {
        score = score.saturating_sub(15);
        violations.push("Transfer rights violation");
    }

    let status = match score {
        90.. => ComplianceStatus::Compliant,
        70..=89 => ComplianceStatus::NonCompliant,
        _ => ComplianceStatus::Violation,
    };

    if !violations.is_empty() {
        tracing::warn!(
            "⚠️ License {} compliance {}: {:?}",
            license.license_id,
            score,
            violations
        );
    }

    ComplianceReport {
        license_id: license.license_id.clone(),
        compliance_score: score,
        status,
        violations,
        recommended_action: if score >= 90 {
            "Proceed"
        } else {
            "Review license terms"
        },
    }
}

pub(crate) fn with_thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
