use chrono::{DateTime, Utc};
use reqwest::Url;

use super::domain::{Item, ItemEdit, ItemId, NewItem, PrincipalId, ReviewStatus};
use super::error::ValidationError;
use super::risk::RiskAssessment;

/// Normalize a webhook URL; blank input clears it.
pub fn parse_webhook_url(raw: &str) -> Result<Option<String>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let url = Url::parse(trimmed)
        .map_err(|_| ValidationError::InvalidWebhookUrl(trimmed.to_string()))?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(Some(trimmed.to_string())),
        _ => Err(ValidationError::InvalidWebhookUrl(trimmed.to_string())),
    }
}

fn required_text(
    value: &str,
    missing: ValidationError,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(missing)
    } else {
        Ok(trimmed.to_string())
    }
}

fn checked_amount(amount: Option<f64>) -> Result<Option<f64>, ValidationError> {
    match amount {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(ValidationError::InvalidAmount(value))
        }
        other => Ok(other),
    }
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Build a scored `Item` from a submission, or explain why it cannot be accepted.
pub(crate) fn item_from_submission(
    submission: NewItem,
    created_by: &PrincipalId,
    now: DateTime<Utc>,
) -> Result<Item, ValidationError> {
    let title = required_text(&submission.title, ValidationError::MissingTitle)?;
    let description = required_text(&submission.description, ValidationError::MissingDescription)?;
    let amount = checked_amount(submission.amount)?;
    let tags = clean_tags(submission.tags);

    let assessment = RiskAssessment::evaluate(amount, &tags);

    Ok(Item {
        id: ItemId::generate(),
        title,
        description,
        amount,
        tags: assessment.tags,
        risk_score: assessment.score,
        status: ReviewStatus::New,
        created_by: created_by.clone(),
        rejection_webhook_url: None,
        created_at: now,
    })
}

/// Apply a detail edit and rescore, leaving status and ownership untouched.
pub(crate) fn apply_edit(item: &Item, edit: ItemEdit) -> Result<Item, ValidationError> {
    if edit.is_empty() {
        return Err(ValidationError::EmptyEdit);
    }

    let mut updated = item.clone();

    if let Some(title) = edit.title {
        updated.title = required_text(&title, ValidationError::MissingTitle)?;
    }
    if let Some(description) = edit.description {
        updated.description = required_text(&description, ValidationError::MissingDescription)?;
    }
    if let Some(amount) = edit.amount {
        updated.amount = checked_amount(amount)?;
    }
    if let Some(tags) = edit.tags {
        updated.tags = clean_tags(tags);
    }

    let assessment = RiskAssessment::evaluate(updated.amount, &updated.tags);
    updated.risk_score = assessment.score;
    updated.tags = assessment.tags;

    Ok(updated)
}
