use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::workflows::review::domain::{
    AuditRecord, Item, ItemId, NewItem, Principal, PrincipalId, ReviewStatus, User,
};
use crate::workflows::review::repository::{
    AuditRepository, CommittedTransition, ItemRepository, NotificationError, RejectionNotifier,
    RepositoryError, ReviewRepository, TransitionWrite, UserRepository, WebhookDelivery,
};
use crate::workflows::review::{review_router, ReviewService, ReviewSettings};

pub(super) const HOOK_URL: &str = "https://hooks.example.com/tickets";
pub(super) const FALLBACK_URL: &str = "https://hooks.example.com/fallback";

pub(super) fn owner() -> Principal {
    Principal::new("user-ana").with_name("Ana Ruiz")
}

pub(super) fn admin() -> Principal {
    Principal::new("admin-bo")
        .with_name("Bo Admin")
        .with_email("bo@example.com")
}

pub(super) fn submission(amount: Option<f64>, tags: &[&str]) -> NewItem {
    NewItem {
        title: "Refund request".to_string(),
        description: "Customer was charged twice".to_string(),
        amount,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

/// Stored ticket with deliberately stale risk fields.
pub(super) fn stale_item(id: &str, amount: Option<f64>, tags: &[&str], risk_score: u32) -> Item {
    Item {
        id: ItemId(id.to_string()),
        title: format!("Imported {id}"),
        description: "Bulk import".to_string(),
        amount,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        risk_score,
        status: ReviewStatus::New,
        created_by: owner().id,
        rejection_webhook_url: None,
        created_at: Utc::now(),
    }
}

pub(super) type TestService = ReviewService<MemoryRepository, RecordingNotifier>;

pub(super) fn build_service(
    settings: ReviewSettings,
) -> (TestService, Arc<MemoryRepository>, Arc<RecordingNotifier>) {
    let repository = Arc::new(MemoryRepository::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = ReviewService::new(repository.clone(), notifier.clone(), settings);
    (service, repository, notifier)
}

pub(super) fn review_router_with_service(service: TestService) -> axum::Router {
    review_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) items: Arc<Mutex<HashMap<ItemId, Item>>>,
    pub(super) audits: Arc<Mutex<Vec<AuditRecord>>>,
    pub(super) users: Arc<Mutex<HashMap<PrincipalId, User>>>,
    pub(super) risk_writes: Arc<AtomicUsize>,
    pub(super) failing_risk_writes: Arc<Mutex<HashSet<ItemId>>>,
    pub(super) failing_audit_writes: Arc<AtomicBool>,
}

impl MemoryRepository {
    pub(super) fn seed(&self, item: Item) {
        self.items
            .lock()
            .expect("repository mutex poisoned")
            .insert(item.id.clone(), item);
    }

    pub(super) fn item(&self, id: &ItemId) -> Item {
        self.items
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
            .expect("item stored")
    }

    pub(super) fn audit_log(&self) -> Vec<AuditRecord> {
        self.audits.lock().expect("audit mutex poisoned").clone()
    }

    pub(super) fn fail_risk_write_for(&self, id: &str) {
        self.failing_risk_writes
            .lock()
            .expect("repository mutex poisoned")
            .insert(ItemId(id.to_string()));
    }

    pub(super) fn risk_write_count(&self) -> usize {
        self.risk_writes.load(Ordering::SeqCst)
    }

    pub(super) fn fail_audit_writes(&self) {
        self.failing_audit_writes.store(true, Ordering::SeqCst);
    }

    pub(super) fn user(&self, id: &PrincipalId) -> Option<User> {
        self.users
            .lock()
            .expect("user mutex poisoned")
            .get(id)
            .cloned()
    }

    /// Overwrite the risk fields directly, as a concurrent sweep would.
    pub(super) fn set_risk(&self, id: &ItemId, risk_score: u32, tags: &[&str]) {
        let mut guard = self.items.lock().expect("repository mutex poisoned");
        let item = guard.get_mut(id).expect("item stored");
        item.risk_score = risk_score;
        item.tags = tags.iter().map(|tag| tag.to_string()).collect();
    }
}

impl ItemRepository for MemoryRepository {
    fn insert_item(&self, item: Item) -> Result<Item, RepositoryError> {
        let mut guard = self.items.lock().expect("repository mutex poisoned");
        if guard.contains_key(&item.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn update_item(&self, item: Item) -> Result<Item, RepositoryError> {
        let mut guard = self.items.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&item.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn fetch_item(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        let guard = self.items.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        let guard = self.items.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn update_risk(
        &self,
        id: &ItemId,
        risk_score: u32,
        tags: Vec<String>,
    ) -> Result<Item, RepositoryError> {
        if self
            .failing_risk_writes
            .lock()
            .expect("repository mutex poisoned")
            .contains(id)
        {
            return Err(RepositoryError::Unavailable("write timed out".to_string()));
        }

        let mut guard = self.items.lock().expect("repository mutex poisoned");
        let item = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        item.risk_score = risk_score;
        item.tags = tags;
        self.risk_writes.fetch_add(1, Ordering::SeqCst);
        Ok(item.clone())
    }
}

impl AuditRepository for MemoryRepository {
    fn append_audit(&self, record: AuditRecord) -> Result<AuditRecord, RepositoryError> {
        if self.failing_audit_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("audit log offline".to_string()));
        }
        self.audits
            .lock()
            .expect("audit mutex poisoned")
            .push(record.clone());
        Ok(record)
    }

    fn recent_audits(&self, limit: usize) -> Result<Vec<AuditRecord>, RepositoryError> {
        let guard = self.audits.lock().expect("audit mutex poisoned");
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

impl UserRepository for MemoryRepository {
    fn upsert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut guard = self.users.lock().expect("user mutex poisoned");
        let merged = match guard.remove(&user.id) {
            Some(existing) => existing.merge(user),
            None => user,
        };
        guard.insert(merged.id.clone(), merged.clone());
        Ok(merged)
    }

    fn fetch_user(&self, id: &PrincipalId) -> Result<Option<User>, RepositoryError> {
        let guard = self.users.lock().expect("user mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

impl ReviewRepository for MemoryRepository {
    fn commit_transition(
        &self,
        write: TransitionWrite,
    ) -> Result<CommittedTransition, RepositoryError> {
        let mut items = self.items.lock().expect("repository mutex poisoned");
        let mut audits = self.audits.lock().expect("audit mutex poisoned");
        let mut users = self.users.lock().expect("user mutex poisoned");

        if !items.contains_key(&write.item_id) {
            return Err(RepositoryError::NotFound);
        }
        if !write.audits.is_empty() && self.failing_audit_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("audit log offline".to_string()));
        }

        let item = items.get_mut(&write.item_id).expect("item checked above");
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

#[derive(Default)]
pub(super) struct RecordingNotifier {
    deliveries: Mutex<Vec<WebhookDelivery>>,
    fail: bool,
}

impl RecordingNotifier {
    pub(super) fn failing() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(super) fn deliveries(&self) -> Vec<WebhookDelivery> {
        self.deliveries
            .lock()
            .expect("notifier mutex poisoned")
            .clone()
    }
}

impl RejectionNotifier for RecordingNotifier {
    fn dispatch(&self, delivery: WebhookDelivery) -> Result<(), NotificationError> {
        self.deliveries
            .lock()
            .expect("notifier mutex poisoned")
            .push(delivery);
        if self.fail {
            Err(NotificationError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Storage that is always down.
pub(super) struct UnavailableRepository;

impl ItemRepository for UnavailableRepository {
    fn insert_item(&self, _item: Item) -> Result<Item, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_item(&self, _item: Item) -> Result<Item, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_item(&self, _id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_risk(
        &self,
        _id: &ItemId,
        _risk_score: u32,
        _tags: Vec<String>,
    ) -> Result<Item, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl AuditRepository for UnavailableRepository {
    fn append_audit(&self, _record: AuditRecord) -> Result<AuditRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent_audits(&self, _limit: usize) -> Result<Vec<AuditRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl UserRepository for UnavailableRepository {
    fn upsert_user(&self, _user: User) -> Result<User, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_user(&self, _id: &PrincipalId) -> Result<Option<User>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl ReviewRepository for UnavailableRepository {
    fn commit_transition(
        &self,
        _write: TransitionWrite,
    ) -> Result<CommittedTransition, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
