use super::domain::{ItemId, ReviewStatus};
use super::repository::RepositoryError;

/// Input rejected before anything is persisted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("title is required")]
    MissingTitle,
    #[error("description is required")]
    MissingDescription,
    #[error("amount must be a non-negative number (found {0})")]
    InvalidAmount(f64),
    #[error("unknown status label '{0}'")]
    UnknownStatusLabel(String),
    #[error("rejection webhook must be an absolute http(s) URL (found '{0}')")]
    InvalidWebhookUrl(String),
    #[error("no changes requested")]
    EmptyEdit,
}

/// Error raised by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("an authenticated principal is required")]
    Unauthorized,
    #[error("ticket {0} not found")]
    NotFound(ItemId),
    #[error("cannot move ticket from {from} to {to}")]
    InvalidTransition { from: ReviewStatus, to: ReviewStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
