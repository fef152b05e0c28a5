use serde::Serialize;
use tracing::{info, warn};

use super::domain::Item;
use super::repository::ItemRepository;
use super::risk::RiskAssessment;

/// Outcome of a risk re-tagging sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub scanned: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Fresh assessment for `item`, or `None` when its stored score and tags already agree.
pub fn pending_reconciliation(item: &Item) -> Option<RiskAssessment> {
    let assessment = RiskAssessment::evaluate(item.amount, &item.tags);
    if assessment.score == item.risk_score && assessment.tags == item.tags {
        None
    } else {
        Some(assessment)
    }
}

/// Re-derive score and the risk marker for every item, writing only the drifted ones.
///
/// Each write is independent; a failing item is logged and counted, never fatal.
pub fn reconcile_all<R>(repository: &R, items: Vec<Item>) -> ReconcileSummary
where
    R: ItemRepository + ?Sized,
{
    let mut summary = ReconcileSummary::default();

    for item in items {
        summary.scanned += 1;

        let Some(assessment) = pending_reconciliation(&item) else {
            continue;
        };

        match repository.update_risk(&item.id, assessment.score, assessment.tags) {
            Ok(_) => summary.updated += 1,
            Err(err) => {
                summary.failed += 1;
                warn!(item_id = %item.id, error = %err, "risk reconciliation failed for item");
            }
        }
    }

    info!(
        scanned = summary.scanned,
        updated = summary.updated,
        failed = summary.failed,
        "risk reconciliation sweep finished"
    );

    summary
}
