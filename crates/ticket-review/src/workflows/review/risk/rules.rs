use super::{RiskCategory, RiskComponent, RiskFactor};

const SENSITIVE_TAGS: [&str; 2] = ["bug report", "billing"];
const SENSITIVE_TAG_SCORE: u32 = 20;

const MID_THRESHOLD: u32 = 25;
const HIGH_THRESHOLD: u32 = 50;

/// Half-open fee bands `[lower, upper)`, checked in order.
const FEE_BANDS: [(f64, Option<f64>, u32); 3] = [
    (1000.0, Some(3000.0), 10),
    (3000.0, Some(5000.0), 25),
    (5000.0, None, 50),
];

pub fn compute_score(amount: Option<f64>, tags: &[String]) -> u32 {
    score_components(amount, tags)
        .iter()
        .map(|component| component.score)
        .sum()
}

pub fn categorize(score: u32) -> RiskCategory {
    if score < MID_THRESHOLD {
        RiskCategory::Low
    } else if score < HIGH_THRESHOLD {
        RiskCategory::Mid
    } else {
        RiskCategory::High
    }
}

/// Break a score into its fee-band and tag contributions.
pub fn score_components(amount: Option<f64>, tags: &[String]) -> Vec<RiskComponent> {
    let fee = amount.filter(|value| value.is_finite()).unwrap_or(0.0);
    let mut components = Vec::with_capacity(2);

    let band = FEE_BANDS.iter().find(|(lower, upper, _)| {
        fee >= *lower && upper.map(|upper| fee < upper).unwrap_or(true)
    });

    components.push(match band {
        Some((lower, Some(upper), score)) => RiskComponent {
            factor: RiskFactor::FeeBand,
            score: *score,
            notes: format!("fee {fee:.2} within [{lower:.0}, {upper:.0})"),
        },
        Some((lower, None, score)) => RiskComponent {
            factor: RiskFactor::FeeBand,
            score: *score,
            notes: format!("fee {fee:.2} at or above {lower:.0}"),
        },
        None => RiskComponent {
            factor: RiskFactor::FeeBand,
            score: 0,
            notes: format!("fee {fee:.2} below {:.0}", FEE_BANDS[0].0),
        },
    });

    let matched: Vec<&str> = SENSITIVE_TAGS
        .iter()
        .copied()
        .filter(|sensitive| tags.iter().any(|tag| tag.to_lowercase() == *sensitive))
        .collect();

    if !matched.is_empty() {
        components.push(RiskComponent {
            factor: RiskFactor::SensitiveTag,
            score: SENSITIVE_TAG_SCORE,
            notes: format!("tagged {}", matched.join(", ")),
        });
    }

    components
}
