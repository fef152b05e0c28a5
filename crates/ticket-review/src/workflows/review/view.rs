use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AuditRecord, Item, ItemId, PrincipalId, ReviewStatus};
use super::risk::{display_tags, RiskCategory};

/// Ticket as presented to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub status: &'static str,
    pub risk: RiskCategory,
    pub risk_score: u32,
    pub tags: Vec<String>,
    pub price: f64,
    pub created_by: PrincipalId,
    pub created_at: DateTime<Utc>,
    pub rejection_webhook_url: Option<String>,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            status: item.status.label(),
            risk: item.risk_category(),
            risk_score: item.risk_score,
            tags: display_tags(&item.tags),
            price: item.amount.unwrap_or(0.0),
            created_by: item.created_by.clone(),
            created_at: item.created_at,
            rejection_webhook_url: item.rejection_webhook_url.clone(),
        }
    }
}

/// Audit feed row joined with ticket title and actor name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryView {
    pub id: String,
    pub item_id: ItemId,
    pub item_title: String,
    pub user: String,
    pub action: &'static str,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: String,
}

impl AuditEntryView {
    pub fn new(record: &AuditRecord, item_title: Option<&str>, user_name: Option<&str>) -> Self {
        Self {
            id: record.id.0.clone(),
            item_id: record.item_id.clone(),
            item_title: item_title.unwrap_or("-").to_string(),
            user: user_name.unwrap_or("-").to_string(),
            action: record.action.label(),
            old_value: record.old_value.clone(),
            new_value: record.new_value.clone(),
            created_at: record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TicketScope {
    #[default]
    Mine,
    All,
}

/// Raw listing query as it arrives from the dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketQuery {
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
}

/// Listing filter; `None` fields match everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TicketFilter {
    pub scope: TicketScope,
    pub status: Option<ReviewStatus>,
    pub risk: Option<RiskCategory>,
}

impl TicketFilter {
    pub fn all() -> Self {
        Self {
            scope: TicketScope::All,
            ..Self::default()
        }
    }

    /// Unrecognized values fall back to "no filter", matching the dashboard's `all` option.
    pub fn from_query(query: &TicketQuery) -> Self {
        let scope = match query.scope.as_deref() {
            Some("all") => TicketScope::All,
            _ => TicketScope::Mine,
        };
        let status = query.status.as_deref().and_then(ReviewStatus::from_label);
        let risk = query.risk.as_deref().and_then(RiskCategory::from_label);

        Self {
            scope,
            status,
            risk,
        }
    }

    /// `Mine` without a principal matches nothing.
    pub fn matches(&self, item: &Item, principal: Option<&PrincipalId>) -> bool {
        let in_scope = match self.scope {
            TicketScope::All => true,
            TicketScope::Mine => principal.is_some_and(|id| *id == item.created_by),
        };

        in_scope
            && self.status.map_or(true, |status| status == item.status)
            && self.risk.map_or(true, |risk| risk == item.risk_category())
    }
}
