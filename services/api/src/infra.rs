use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use ticket_review::workflows::review::{
    AuditRecord, AuditRepository, CommittedTransition, Item, ItemId, ItemRepository,
    NotificationError, PrincipalId, RejectionNotifier, RepositoryError, ReviewRepository,
    TransitionWrite, User, UserRepository, WebhookDelivery,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local ticket store backing the service until a database adapter is wired in.
#[derive(Default, Clone)]
pub(crate) struct InMemoryReviewRepository {
    items: Arc<Mutex<HashMap<ItemId, Item>>>,
    audits: Arc<Mutex<Vec<AuditRecord>>>,
    users: Arc<Mutex<HashMap<PrincipalId, User>>>,
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("in-memory store lock poisoned".to_string())
}

impl ItemRepository for InMemoryReviewRepository {
    fn insert_item(&self, item: Item) -> Result<Item, RepositoryError> {
        let mut guard = self.items.lock().map_err(poisoned)?;
        if guard.contains_key(&item.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn update_item(&self, item: Item) -> Result<Item, RepositoryError> {
        let mut guard = self.items.lock().map_err(poisoned)?;
        if guard.contains_key(&item.id) {
            guard.insert(item.id.clone(), item.clone());
            Ok(item)
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch_item(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        let guard = self.items.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        let guard = self.items.lock().map_err(poisoned)?;
        Ok(guard.values().cloned().collect())
    }

    fn update_risk(
        &self,
        id: &ItemId,
        risk_score: u32,
        tags: Vec<String>,
    ) -> Result<Item, RepositoryError> {
        let mut guard = self.items.lock().map_err(poisoned)?;
        let item = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        item.risk_score = risk_score;
        item.tags = tags;
        Ok(item.clone())
    }
}

impl AuditRepository for InMemoryReviewRepository {
    fn append_audit(&self, record: AuditRecord) -> Result<AuditRecord, RepositoryError> {
        let mut guard = self.audits.lock().map_err(poisoned)?;
        guard.push(record.clone());
        Ok(record)
    }

    fn recent_audits(&self, limit: usize) -> Result<Vec<AuditRecord>, RepositoryError> {
        let guard = self.audits.lock().map_err(poisoned)?;
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

impl UserRepository for InMemoryReviewRepository {
    fn upsert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut guard = self.users.lock().map_err(poisoned)?;
        let merged = match guard.remove(&user.id) {
            Some(existing) => existing.merge(user),
            None => user,
        };
        guard.insert(merged.id.clone(), merged.clone());
        Ok(merged)
    }

    fn fetch_user(&self, id: &PrincipalId) -> Result<Option<User>, RepositoryError> {
        let guard = self.users.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }
}

impl ReviewRepository for InMemoryReviewRepository {
    fn commit_transition(
        &self,
        write: TransitionWrite,
    ) -> Result<CommittedTransition, RepositoryError> {
        // Lock order: items, audits, users.
        let mut items = self.items.lock().map_err(poisoned)?;
        let mut audits = self.audits.lock().map_err(poisoned)?;
        let mut users = self.users.lock().map_err(poisoned)?;

        let item = items
            .get_mut(&write.item_id)
            .ok_or(RepositoryError::NotFound)?;
        write.apply_to(item);
        let item = item.clone();

        audits.extend(write.audits.iter().cloned());

        let actor = match users.remove(&write.actor.id) {
            Some(existing) => existing.merge(write.actor),
            None => write.actor,
        };
        users.insert(actor.id.clone(), actor);

        Ok(CommittedTransition {
            item,
            audits: write.audits,
        })
    }
}

/// Keeps rejection notices in memory; used by the CLI demos in place of real HTTP delivery.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifier {
    deliveries: Arc<Mutex<Vec<WebhookDelivery>>>,
}

impl RejectionNotifier for InMemoryNotifier {
    fn dispatch(&self, delivery: WebhookDelivery) -> Result<(), NotificationError> {
        let mut guard = self
            .deliveries
            .lock()
            .map_err(|_| NotificationError::Transport("notifier lock poisoned".to_string()))?;
        guard.push(delivery);
        Ok(())
    }
}

impl InMemoryNotifier {
    pub(crate) fn deliveries(&self) -> Vec<WebhookDelivery> {
        self.deliveries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
