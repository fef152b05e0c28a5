use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use ticket_review::workflows::review::{
    AuditAction, AuditRecord, AuditRepository, CommittedTransition, Item, ItemId, ItemRepository,
    NotificationError, NotificationOutcome, Principal, PrincipalId, RejectionNotifier,
    RepositoryError, ReviewRepository, ReviewService, ReviewSettings, ReviewStatus, RiskCategory,
    TicketCsvImporter, TicketFilter, TransitionRequest, TransitionWrite, User, UserRepository,
    WebhookDelivery,
};

#[derive(Default)]
struct InMemoryDesk {
    items: Mutex<HashMap<ItemId, Item>>,
    audits: Mutex<Vec<AuditRecord>>,
    users: Mutex<HashMap<PrincipalId, User>>,
}

impl ItemRepository for InMemoryDesk {
    fn insert_item(&self, item: Item) -> Result<Item, RepositoryError> {
        let mut items = self.items.lock().expect("items lock");
        if items.contains_key(&item.id) {
            return Err(RepositoryError::Conflict);
        }
        items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn update_item(&self, item: Item) -> Result<Item, RepositoryError> {
        let mut items = self.items.lock().expect("items lock");
        match items.get_mut(&item.id) {
            Some(slot) => {
                *slot = item.clone();
                Ok(item)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_item(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        Ok(self.items.lock().expect("items lock").get(id).cloned())
    }

    fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        Ok(self.items.lock().expect("items lock").values().cloned().collect())
    }

    fn update_risk(
        &self,
        id: &ItemId,
        risk_score: u32,
        tags: Vec<String>,
    ) -> Result<Item, RepositoryError> {
        let mut items = self.items.lock().expect("items lock");
        let item = items.get_mut(id).ok_or(RepositoryError::NotFound)?;
        item.risk_score = risk_score;
        item.tags = tags;
        Ok(item.clone())
    }
}

impl AuditRepository for InMemoryDesk {
    fn append_audit(&self, record: AuditRecord) -> Result<AuditRecord, RepositoryError> {
        self.audits.lock().expect("audit lock").push(record.clone());
        Ok(record)
    }

    fn recent_audits(&self, limit: usize) -> Result<Vec<AuditRecord>, RepositoryError> {
        let audits = self.audits.lock().expect("audit lock");
        Ok(audits.iter().rev().take(limit).cloned().collect())
    }
}

impl UserRepository for InMemoryDesk {
    fn upsert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().expect("user lock");
        let merged = match users.remove(&user.id) {
            Some(existing) => existing.merge(user),
            None => user,
        };
        users.insert(merged.id.clone(), merged.clone());
        Ok(merged)
    }

    fn fetch_user(&self, id: &PrincipalId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.lock().expect("user lock").get(id).cloned())
    }
}

impl ReviewRepository for InMemoryDesk {
    fn commit_transition(
        &self,
        write: TransitionWrite,
    ) -> Result<CommittedTransition, RepositoryError> {
        let mut items = self.items.lock().expect("items lock");
        let mut audits = self.audits.lock().expect("audit lock");
        let mut users = self.users.lock().expect("user lock");

        let item = items.get_mut(&write.item_id).ok_or(RepositoryError::NotFound)?;
        write.apply_to(item);
        audits.extend(write.audits.iter().cloned());
        let actor = match users.remove(&write.actor.id) {
            Some(existing) => existing.merge(write.actor),
            None => write.actor,
        };
        users.insert(actor.id.clone(), actor);

        Ok(CommittedTransition {
            item: item.clone(),
            audits: write.audits,
        })
    }
}

#[derive(Default)]
struct CollectingNotifier {
    sent: Mutex<Vec<WebhookDelivery>>,
}

impl RejectionNotifier for CollectingNotifier {
    fn dispatch(&self, delivery: WebhookDelivery) -> Result<(), NotificationError> {
        self.sent.lock().expect("notifier lock").push(delivery);
        Ok(())
    }
}

fn desk(fallback: Option<&str>) -> (
    ReviewService<InMemoryDesk, CollectingNotifier>,
    Arc<InMemoryDesk>,
    Arc<CollectingNotifier>,
) {
    let store = Arc::new(InMemoryDesk::default());
    let notifier = Arc::new(CollectingNotifier::default());
    let settings = ReviewSettings {
        fallback_webhook_url: fallback.map(str::to_string),
        ..ReviewSettings::default()
    };
    (
        ReviewService::new(store.clone(), notifier.clone(), settings),
        store,
        notifier,
    )
}

#[test]
fn ticket_moves_from_intake_to_rejection_with_full_audit_trail() {
    let (service, store, notifier) = desk(Some("https://ops.example.com/rejections"));
    let requester = Principal::new("req-17").with_name("Casey Lin");
    let reviewer = Principal::new("rev-02").with_name("Morgan Diaz");

    let ticket = service
        .submit(
            Some(&requester),
            ticket_review::workflows::review::NewItem {
                title: "Chargeback dispute".to_string(),
                description: "Card issuer reversed payment".to_string(),
                amount: Some(3200.0),
                tags: vec!["Billing".to_string()],
            },
        )
        .expect("ticket accepted");
    assert_eq!(ticket.risk_score, 45);
    assert_eq!(ticket.risk_category(), RiskCategory::Mid);

    service
        .transition(
            &ticket.id,
            Some(&reviewer),
            TransitionRequest::status("pending").with_note("pulling statements"),
        )
        .expect("review starts");

    let rejected = service
        .transition(
            &ticket.id,
            Some(&reviewer),
            TransitionRequest::status("Rejected").with_note("outside dispute window"),
        )
        .expect("rejection succeeds");

    assert_eq!(rejected.previous_status, ReviewStatus::InReview);
    assert_eq!(rejected.item.status, ReviewStatus::Rejected);
    assert!(matches!(
        rejected.notification,
        NotificationOutcome::Dispatched { .. }
    ));

    let sent = notifier.sent.lock().expect("notifier lock").clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url, "https://ops.example.com/rejections");
    let payload = serde_json::to_value(&sent[0].event).expect("event serializes");
    assert_eq!(payload["type"], "ticket.rejected");
    assert_eq!(payload["payload"]["id"], ticket.id.0.as_str());
    assert_eq!(payload["payload"]["createdBy"], "req-17");
    assert!(payload["payload"]["rejectedAt"].is_string());

    let actions: Vec<AuditAction> = store
        .audits
        .lock()
        .expect("audit lock")
        .iter()
        .map(|record| record.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::StatusChanged,
            AuditAction::NoteAdded,
            AuditAction::StatusChanged,
            AuditAction::NoteAdded,
        ]
    );

    let feed = service.audit_feed(None).expect("feed loads");
    assert_eq!(feed.len(), 4);
    assert_eq!(feed[0].new_value.as_deref(), Some("outside dispute window"));
    assert!(feed.iter().all(|entry| entry.user == "Morgan Diaz"));
    assert!(feed.iter().all(|entry| entry.item_title == "Chargeback dispute"));
}

#[test]
fn csv_import_then_sweep_converges_on_stored_scores() {
    let (service, store, _) = desk(None);
    let importer = Principal::new("ops-bot");
    let export = "title,description,price,tags\n\
                  Refund,Charged twice,5200,Billing\n\
                  Login loop,Cannot sign in,,bug report; auth\n\
                  Typo,Footer copy,20,\n";

    let rows = TicketCsvImporter::from_reader(Cursor::new(export)).expect("export parses");
    for row in rows {
        service.submit(Some(&importer), row).expect("row accepted");
    }

    {
        let mut items = store.items.lock().expect("items lock");
        for item in items.values_mut() {
            item.risk_score = 0;
            item.tags.retain(|tag| tag != "High Risk");
        }
    }

    let summary = service.reconcile_all().expect("sweep runs");
    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.updated, 2);

    let high = service
        .list(
            None,
            &TicketFilter {
                risk: Some(RiskCategory::High),
                ..TicketFilter::all()
            },
        )
        .expect("listing");
    assert_eq!(high.len(), 1);
    assert_eq!(high[0].title, "Refund");
    assert_eq!(high[0].risk_score, 70);

    assert_eq!(service.reconcile_all().expect("sweep runs").updated, 0);
}
