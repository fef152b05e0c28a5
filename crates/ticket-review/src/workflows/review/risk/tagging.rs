use super::RiskCategory;

/// Marker tag carried by tickets whose category is high.
pub const HIGH_RISK_TAG: &str = "High Risk";

fn is_high_risk_marker(tag: &str) -> bool {
    tag.to_lowercase() == "high risk"
}

pub fn has_high_risk_tag(tags: &[String]) -> bool {
    tags.iter().any(|tag| is_high_risk_marker(tag))
}

/// Bring the marker in line with `category`: exactly one appended at high, none below.
pub fn reconcile_high_risk_tag(tags: &[String], category: RiskCategory) -> Vec<String> {
    let has_marker = has_high_risk_tag(tags);

    match (category, has_marker) {
        (RiskCategory::High, false) => {
            let mut reconciled = tags.to_vec();
            reconciled.push(HIGH_RISK_TAG.to_string());
            reconciled
        }
        (RiskCategory::High, true) => tags.to_vec(),
        (_, true) => tags
            .iter()
            .filter(|tag| !is_high_risk_marker(tag))
            .cloned()
            .collect(),
        (_, false) => tags.to_vec(),
    }
}

/// Tags suitable for display, without the internal risk marker.
pub fn display_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter(|tag| !is_high_risk_marker(tag))
        .cloned()
        .collect()
}
