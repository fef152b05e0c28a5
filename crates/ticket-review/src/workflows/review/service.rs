use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    Item, ItemEdit, ItemId, NewItem, Principal, PrincipalId, ReviewStatus, User,
};
use super::error::ReviewError;
use super::intake::{apply_edit, item_from_submission};
use super::reconcile::{reconcile_all, ReconcileSummary};
use super::repository::{RejectionEvent, RejectionNotifier, ReviewRepository, WebhookDelivery};
use super::settings::ReviewSettings;
use super::status::StatusVocabulary;
use super::transition::{plan_transition, NotificationOutcome, TransitionRequest, TransitionResult};
use super::view::{AuditEntryView, ItemView, TicketFilter};

/// Service composing the risk classifier, status machine, storage, and rejection hook.
pub struct ReviewService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    settings: ReviewSettings,
    vocabulary: StatusVocabulary,
}

impl<R, N> ReviewService<R, N>
where
    R: ReviewRepository + 'static,
    N: RejectionNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, settings: ReviewSettings) -> Self {
        let vocabulary = StatusVocabulary::with_legacy_aliases(settings.unknown_status);
        Self {
            repository,
            notifier,
            settings,
            vocabulary,
        }
    }

    /// Replace the inbound status vocabulary (e.g. to add client-specific aliases).
    pub fn with_vocabulary(mut self, vocabulary: StatusVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn settings(&self) -> &ReviewSettings {
        &self.settings
    }

    /// Submit a new ticket on behalf of `principal`, scoring it before it is stored.
    pub fn submit(
        &self,
        principal: Option<&Principal>,
        submission: NewItem,
    ) -> Result<Item, ReviewError> {
        let principal = principal.ok_or(ReviewError::Unauthorized)?;
        let item = item_from_submission(submission, &principal.id, Utc::now())?;

        self.repository
            .upsert_user(User::from_principal(principal))?;
        let stored = self.repository.insert_item(item)?;

        info!(
            item_id = %stored.id,
            created_by = %stored.created_by,
            risk_score = stored.risk_score,
            risk = stored.risk_category().label(),
            "ticket submitted"
        );
        Ok(stored)
    }

    pub fn get(&self, id: &ItemId) -> Result<Item, ReviewError> {
        self.repository
            .fetch_item(id)?
            .ok_or_else(|| ReviewError::NotFound(id.clone()))
    }

    /// Tickets visible to `principal` under `filter`, newest first.
    pub fn list(
        &self,
        principal: Option<&PrincipalId>,
        filter: &TicketFilter,
    ) -> Result<Vec<ItemView>, ReviewError> {
        let mut items: Vec<Item> = self
            .repository
            .list_items()?
            .into_iter()
            .filter(|item| filter.matches(item, principal))
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(items.iter().map(ItemView::from).collect())
    }

    /// Apply an admin request: status change, note, and/or webhook update.
    ///
    /// The acting user, the changed ticket fields, and the audit records are committed as one
    /// unit before this returns; a rejection notice is then handed to the notifier without
    /// waiting on delivery.
    pub fn transition(
        &self,
        id: &ItemId,
        principal: Option<&Principal>,
        request: TransitionRequest,
    ) -> Result<TransitionResult, ReviewError> {
        let principal = principal.ok_or(ReviewError::Unauthorized)?;
        let current = self.get(id)?;

        let plan = plan_transition(
            &current,
            &request,
            &principal.id,
            &self.vocabulary,
            self.settings.transition_policy,
            Utc::now(),
        )?;

        let committed = self
            .repository
            .commit_transition(plan.into_write(User::from_principal(principal)))?;
        let item = committed.item;

        if current.status != item.status {
            info!(
                item_id = %item.id,
                actor = %principal.id,
                from = current.status.label(),
                to = item.status.label(),
                "ticket status changed"
            );
        }

        let notification = if item.status == ReviewStatus::Rejected {
            self.notify_rejection(&item)
        } else {
            NotificationOutcome::NotRequired
        };

        Ok(TransitionResult {
            item,
            audits: committed.audits,
            previous_status: current.status,
            notification,
        })
    }

    /// Edit title, description, fee, or tags; the ticket is always rescored.
    pub fn update_details(
        &self,
        id: &ItemId,
        principal: Option<&Principal>,
        edit: ItemEdit,
    ) -> Result<Item, ReviewError> {
        let principal = principal.ok_or(ReviewError::Unauthorized)?;
        let current = self.get(id)?;
        let updated = apply_edit(&current, edit)?;

        self.repository
            .upsert_user(User::from_principal(principal))?;
        let stored = self.repository.update_item(updated)?;

        info!(
            item_id = %stored.id,
            actor = %principal.id,
            risk_score = stored.risk_score,
            "ticket details updated"
        );
        Ok(stored)
    }

    /// Most recent audit records, capped at the configured feed size.
    pub fn audit_feed(&self, limit: Option<usize>) -> Result<Vec<AuditEntryView>, ReviewError> {
        let cap = self.settings.audit_feed_limit;
        let limit = limit.map_or(cap, |requested| requested.min(cap));
        let records = self.repository.recent_audits(limit)?;

        let mut titles: HashMap<ItemId, Option<String>> = HashMap::new();
        let mut names: HashMap<PrincipalId, Option<String>> = HashMap::new();
        let mut entries = Vec::with_capacity(records.len());

        for record in &records {
            if !titles.contains_key(&record.item_id) {
                let title = self
                    .repository
                    .fetch_item(&record.item_id)?
                    .map(|item| item.title);
                titles.insert(record.item_id.clone(), title);
            }
            if !names.contains_key(&record.user_id) {
                let name = self
                    .repository
                    .fetch_user(&record.user_id)?
                    .and_then(|user| user.name);
                names.insert(record.user_id.clone(), name);
            }

            let title = titles.get(&record.item_id).and_then(|title| title.as_deref());
            let name = names.get(&record.user_id).and_then(|name| name.as_deref());
            entries.push(AuditEntryView::new(record, title, name));
        }

        Ok(entries)
    }

    /// Sweep every stored ticket, realigning score and the risk marker.
    pub fn reconcile_all(&self) -> Result<ReconcileSummary, ReviewError> {
        let items = self.repository.list_items()?;
        Ok(reconcile_all(self.repository.as_ref(), items))
    }

    fn notify_rejection(&self, item: &Item) -> NotificationOutcome {
        let target = item
            .rejection_webhook_url
            .clone()
            .or_else(|| self.settings.fallback_webhook_url.clone());

        let Some(target) = target else {
            debug!(item_id = %item.id, "no rejection webhook configured");
            return NotificationOutcome::NoTarget;
        };

        let delivery = WebhookDelivery {
            url: target.clone(),
            event: RejectionEvent::for_item(item, Utc::now()),
        };

        match self.notifier.dispatch(delivery) {
            Ok(()) => NotificationOutcome::Dispatched { target },
            Err(err) => {
                warn!(item_id = %item.id, target = %target, error = %err, "rejection webhook not dispatched");
                NotificationOutcome::Failed { target }
            }
        }
    }
}
