use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AuditRecord, Item, ItemId, PrincipalId, ReviewStatus, User};

/// Keyed ticket storage.
pub trait ItemRepository: Send + Sync {
    fn insert_item(&self, item: Item) -> Result<Item, RepositoryError>;
    fn update_item(&self, item: Item) -> Result<Item, RepositoryError>;
    fn fetch_item(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError>;
    fn list_items(&self) -> Result<Vec<Item>, RepositoryError>;

    /// Partial write touching only the derived risk fields.
    fn update_risk(
        &self,
        id: &ItemId,
        risk_score: u32,
        tags: Vec<String>,
    ) -> Result<Item, RepositoryError>;
}

/// Append-only audit log.
pub trait AuditRepository: Send + Sync {
    fn append_audit(&self, record: AuditRecord) -> Result<AuditRecord, RepositoryError>;
    /// Newest first.
    fn recent_audits(&self, limit: usize) -> Result<Vec<AuditRecord>, RepositoryError>;
}

pub trait UserRepository: Send + Sync {
    fn upsert_user(&self, user: User) -> Result<User, RepositoryError>;
    fn fetch_user(&self, id: &PrincipalId) -> Result<Option<User>, RepositoryError>;
}

/// Everything the review service persists through.
pub trait ReviewRepository: ItemRepository + AuditRepository + UserRepository {
    /// Apply a transition as one unit: the acting user, the changed item fields, and every
    /// audit record are stored together or not at all.
    fn commit_transition(
        &self,
        write: TransitionWrite,
    ) -> Result<CommittedTransition, RepositoryError>;
}

/// Storage writes produced by one admin transition.
///
/// `None` fields are left untouched so concurrent risk writes are not overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionWrite {
    pub item_id: ItemId,
    pub status: Option<ReviewStatus>,
    pub rejection_webhook_url: Option<Option<String>>,
    pub audits: Vec<AuditRecord>,
    pub actor: User,
}

impl TransitionWrite {
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(url) = &self.rejection_webhook_url {
            item.rejection_webhook_url = url.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommittedTransition {
    pub item: Item,
    pub audits: Vec<AuditRecord>,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for rejected tickets. Implementations must return without waiting on
/// delivery; the outcome of the POST itself is theirs to log.
pub trait RejectionNotifier: Send + Sync {
    fn dispatch(&self, delivery: WebhookDelivery) -> Result<(), NotificationError>;
}

/// A single rejection notice bound for `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub url: String,
    pub event: RejectionEvent,
}

pub const TICKET_REJECTED_EVENT: &str = "ticket.rejected";

/// Body POSTed to rejection webhooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: RejectionPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionPayload {
    pub id: ItemId,
    pub title: String,
    pub created_by: PrincipalId,
    pub rejected_at: DateTime<Utc>,
}

impl RejectionEvent {
    pub fn for_item(item: &Item, rejected_at: DateTime<Utc>) -> Self {
        Self {
            kind: TICKET_REJECTED_EVENT.to_string(),
            payload: RejectionPayload {
                id: item.id.clone(),
                title: item.title.clone(),
                created_by: item.created_by.clone(),
                rejected_at,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("no async runtime available to deliver webhook")]
    RuntimeUnavailable,
    #[error("webhook client could not be built: {0}")]
    Client(String),
    #[error("webhook transport failed: {0}")]
    Transport(String),
    #[error("webhook responded with status {0}")]
    Rejected(u16),
}
