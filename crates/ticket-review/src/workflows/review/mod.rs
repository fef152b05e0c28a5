//! Ticket review desk: risk classification, the audited status machine, and the
//! risk re-tagging sweep.
//!
//! Storage and outbound delivery sit behind the traits in [`repository`], so the service
//! can be driven by in-memory stores in tests and by real adapters in the API binary.

pub mod domain;
pub mod error;
pub mod import;
mod intake;
pub mod notifier;
pub mod reconcile;
pub mod repository;
pub mod risk;
pub mod router;
pub mod service;
mod settings;
mod status;
pub mod transition;
pub mod view;

#[cfg(test)]
mod tests;

pub use domain::{
    AuditAction, AuditId, AuditRecord, Item, ItemEdit, ItemId, NewItem, Principal, PrincipalId,
    ReviewStatus, User,
};
pub use error::{ReviewError, ValidationError};
pub use import::{TicketCsvImporter, TicketImportError};
pub use intake::parse_webhook_url;
pub use notifier::WebhookNotifier;
pub use reconcile::{pending_reconciliation, reconcile_all, ReconcileSummary};
pub use repository::{
    AuditRepository, CommittedTransition, ItemRepository, NotificationError, RejectionEvent,
    RejectionNotifier, RejectionPayload, RepositoryError, ReviewRepository, TransitionWrite,
    UserRepository, WebhookDelivery, TICKET_REJECTED_EVENT,
};
pub use risk::{categorize, compute_score, RiskAssessment, RiskCategory};
pub use router::{principal_from_headers, review_router};
pub use service::ReviewService;
pub use settings::ReviewSettings;
pub use status::{StatusVocabulary, UnknownStatusPolicy};
pub use transition::{NotificationOutcome, TransitionPolicy, TransitionRequest, TransitionResult};
pub use view::{AuditEntryView, ItemView, TicketFilter, TicketQuery, TicketScope};
