//! Deterministic risk classification of tickets from their declared fee and tags.

mod rules;
mod tagging;

pub use rules::{categorize, compute_score, score_components};
pub use tagging::{display_tags, has_high_risk_tag, reconcile_high_risk_tag, HIGH_RISK_TAG};

use serde::{Deserialize, Serialize};

/// Coarse bucket derived from the risk score via fixed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Low,
    Mid,
    High,
}

impl RiskCategory {
    pub const fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "low",
            RiskCategory::Mid => "mid",
            RiskCategory::High => "high",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "mid" => Some(Self::Mid),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Signal contributing to a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    FeeBand,
    SensitiveTag,
}

/// Discrete contribution to a score, kept so operators can see why a ticket was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskComponent {
    pub factor: RiskFactor,
    pub score: u32,
    pub notes: String,
}

/// Score, category, and the tag set a ticket should carry for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub category: RiskCategory,
    pub tags: Vec<String>,
}

impl RiskAssessment {
    pub fn evaluate(amount: Option<f64>, tags: &[String]) -> Self {
        let score = compute_score(amount, tags);
        let category = categorize(score);
        let tags = reconcile_high_risk_tag(tags, category);

        Self {
            score,
            category,
            tags,
        }
    }
}
