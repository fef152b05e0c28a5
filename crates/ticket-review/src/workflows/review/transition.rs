use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{deserialize_some, AuditRecord, Item, PrincipalId, ReviewStatus, User};
use super::error::ReviewError;
use super::intake::parse_webhook_url;
use super::repository::TransitionWrite;
use super::status::StatusVocabulary;

/// Whether statuses may move backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any canonical status may follow any other.
    #[default]
    Permissive,
    /// New → In-Review → {Rejected, Approved}; New may be decided directly.
    ForwardOnly,
}

/// Admin request against a single ticket. Every field is optional and independent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// `Some(None)` clears the hook, `None` leaves it untouched.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub rejection_webhook_url: Option<Option<String>>,
}

impl TransitionRequest {
    pub fn status(label: impl Into<String>) -> Self {
        Self {
            status: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_webhook(mut self, url: Option<&str>) -> Self {
        self.rejection_webhook_url = Some(url.map(str::to_string));
        self
    }
}

/// What happened to the rejection webhook after a transition committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NotificationOutcome {
    NotRequired,
    NoTarget,
    Dispatched { target: String },
    Failed { target: String },
}

/// Committed result of a transition request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResult {
    pub item: Item,
    pub audits: Vec<AuditRecord>,
    pub previous_status: ReviewStatus,
    pub notification: NotificationOutcome,
}

impl TransitionResult {
    pub fn status_changed(&self) -> bool {
        self.previous_status != self.item.status
    }
}

/// Validated, not yet persisted, outcome of a request.
///
/// `item` previews the ticket after the write; only the `*_change` fields are persisted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TransitionPlan {
    pub item: Item,
    pub status_change: Option<ReviewStatus>,
    pub webhook_change: Option<Option<String>>,
    pub audits: Vec<AuditRecord>,
}

impl TransitionPlan {
    pub fn item_changed(&self) -> bool {
        self.status_change.is_some() || self.webhook_change.is_some()
    }

    /// Bundle the plan with the acting user into one storage write.
    pub fn into_write(self, actor: User) -> TransitionWrite {
        TransitionWrite {
            item_id: self.item.id,
            status: self.status_change,
            rejection_webhook_url: self.webhook_change,
            audits: self.audits,
            actor,
        }
    }
}

/// Validate `request` against `item` and compute the writes it implies.
///
/// Nothing here touches storage, so a failed request leaves no trace.
pub(crate) fn plan_transition(
    item: &Item,
    request: &TransitionRequest,
    actor: &PrincipalId,
    vocabulary: &StatusVocabulary,
    policy: TransitionPolicy,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, ReviewError> {
    let requested = match request.status.as_deref() {
        Some(raw) => vocabulary.resolve(raw)?,
        None => None,
    };

    let webhook = match &request.rejection_webhook_url {
        Some(Some(raw)) => Some(parse_webhook_url(raw)?),
        Some(None) => Some(None),
        None => None,
    };

    let mut preview = item.clone();
    let mut audits = Vec::new();

    let status_change = requested.filter(|next| *next != item.status);
    if let Some(next) = status_change {
        if policy == TransitionPolicy::ForwardOnly && !item.status.advances_to(next) {
            return Err(ReviewError::InvalidTransition {
                from: item.status,
                to: next,
            });
        }

        preview.status = next;
        audits.push(AuditRecord::status_changed(
            &item.id,
            actor,
            item.status,
            next,
            now,
        ));
    }

    let webhook_change = webhook.filter(|url| *url != item.rejection_webhook_url);
    if let Some(url) = &webhook_change {
        preview.rejection_webhook_url = url.clone();
    }

    if let Some(note) = request.note.as_deref().map(str::trim) {
        if !note.is_empty() {
            audits.push(AuditRecord::note_added(&item.id, actor, note, now));
        }
    }

    Ok(TransitionPlan {
        item: preview,
        status_change,
        webhook_change,
        audits,
    })
}
