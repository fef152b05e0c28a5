use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::risk::{categorize, RiskCategory};

/// Identifier wrapper for submitted tickets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub String);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(pub String);

impl AuditId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// The authenticated actor behind a mutating request, as resolved by the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: PrincipalId(id.into()),
            name: None,
            email: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Lifecycle of a ticket under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    New,
    #[serde(rename = "In-Review")]
    InReview,
    Rejected,
    Approved,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 4] = [
        ReviewStatus::New,
        ReviewStatus::InReview,
        ReviewStatus::Rejected,
        ReviewStatus::Approved,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ReviewStatus::New => "New",
            ReviewStatus::InReview => "In-Review",
            ReviewStatus::Rejected => "Rejected",
            ReviewStatus::Approved => "Approved",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.label() == label)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ReviewStatus::Rejected | ReviewStatus::Approved)
    }

    /// Forward-only progression: New → In-Review → {Rejected, Approved}; New may skip review.
    pub const fn advances_to(self, next: ReviewStatus) -> bool {
        matches!(
            (self, next),
            (ReviewStatus::New, ReviewStatus::InReview)
                | (ReviewStatus::New, ReviewStatus::Rejected)
                | (ReviewStatus::New, ReviewStatus::Approved)
                | (ReviewStatus::InReview, ReviewStatus::Rejected)
                | (ReviewStatus::InReview, ReviewStatus::Approved)
        )
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A submitted ticket with its derived risk score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub amount: Option<f64>,
    pub tags: Vec<String>,
    pub risk_score: u32,
    pub status: ReviewStatus,
    pub created_by: PrincipalId,
    pub rejection_webhook_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn risk_category(&self) -> RiskCategory {
        categorize(self.risk_score)
    }
}

/// Fields accepted when a principal submits a new ticket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial edit of ticket details; `amount: Some(None)` clears the fee.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ItemEdit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "price", deserialize_with = "deserialize_some")]
    pub amount: Option<Option<f64>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl ItemEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.amount.is_none()
            && self.tags.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    StatusChanged,
    NoteAdded,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::StatusChanged => "STATUS_CHANGED",
            AuditAction::NoteAdded => "NOTE_ADDED",
        }
    }
}

/// Append-only log entry written against a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditId,
    pub item_id: ItemId,
    pub user_id: PrincipalId,
    pub action: AuditAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub(crate) fn status_changed(
        item_id: &ItemId,
        actor: &PrincipalId,
        from: ReviewStatus,
        to: ReviewStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditId::generate(),
            item_id: item_id.clone(),
            user_id: actor.clone(),
            action: AuditAction::StatusChanged,
            old_value: Some(from.label().to_string()),
            new_value: Some(to.label().to_string()),
            created_at: at,
        }
    }

    pub(crate) fn note_added(
        item_id: &ItemId,
        actor: &PrincipalId,
        note: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditId::generate(),
            item_id: item_id.clone(),
            user_id: actor.clone(),
            action: AuditAction::NoteAdded,
            old_value: None,
            new_value: Some(note.to_string()),
            created_at: at,
        }
    }
}

/// Profile of a principal, upserted on their first authenticated write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: PrincipalId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

impl User {
    pub fn from_principal(principal: &Principal) -> Self {
        Self {
            id: principal.id.clone(),
            name: principal.name.clone(),
            email: principal.email.clone(),
            image: None,
        }
    }

    /// Fill gaps from `incoming` without discarding anything already known.
    pub fn merge(mut self, incoming: User) -> Self {
        if incoming.name.is_some() {
            self.name = incoming.name;
        }
        if incoming.email.is_some() {
            self.email = incoming.email;
        }
        if incoming.image.is_some() {
            self.image = incoming.image;
        }
        self
    }
}

/// Distinguishes an absent field from an explicit `null`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
