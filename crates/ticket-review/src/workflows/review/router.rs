use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{ItemEdit, ItemId, NewItem, Principal};
use super::error::ReviewError;
use super::repository::{RejectionNotifier, ReviewRepository};
use super::service::ReviewService;
use super::transition::TransitionRequest;
use super::view::{ItemView, TicketFilter, TicketQuery};

pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_NAME_HEADER: &str = "x-principal-name";
pub const PRINCIPAL_EMAIL_HEADER: &str = "x-principal-email";

/// Resolve the acting principal forwarded by the session layer; `None` means anonymous.
pub fn principal_from_headers(headers: &HeaderMap) -> Option<Principal> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let mut principal = Principal::new(header(PRINCIPAL_ID_HEADER)?);
    principal.name = header(PRINCIPAL_NAME_HEADER);
    principal.email = header(PRINCIPAL_EMAIL_HEADER);
    Some(principal)
}

/// Router builder exposing ticket intake, triage, audit, and sweep endpoints.
pub fn review_router<R, N>(service: Arc<ReviewService<R, N>>) -> Router
where
    R: ReviewRepository + 'static,
    N: RejectionNotifier + 'static,
{
    Router::new()
        .route(
            "/api/tickets",
            get(list_handler::<R, N>).post(create_handler::<R, N>),
        )
        .route(
            "/api/tickets/:id",
            get(detail_handler::<R, N>).patch(transition_handler::<R, N>),
        )
        .route("/api/tickets/:id/details", put(edit_handler::<R, N>))
        .route("/api/audits", get(audit_handler::<R, N>))
        .route(
            "/api/cron/auto-tag-high-risk",
            get(sweep_handler::<R, N>).post(sweep_handler::<R, N>),
        )
        .with_state(service)
}

/// Intake body; accepts the dashboard's single `tag` as well as a `tags` list.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTicketRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

impl From<CreateTicketRequest> for NewItem {
    fn from(request: CreateTicketRequest) -> Self {
        let mut tags = request.tags;
        if let Some(tag) = request.tag {
            tags.insert(0, tag);
        }

        NewItem {
            title: request.title,
            description: request.description,
            amount: request.price,
            tags,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

fn error_response(err: ReviewError) -> Response {
    let (status, message) = match &err {
        ReviewError::Validation(inner) => (StatusCode::BAD_REQUEST, inner.to_string()),
        ReviewError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        ReviewError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found".to_string()),
        ReviewError::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
        ReviewError::Repository(inner) => {
            error!(error = %inner, "review repository failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Request could not be completed".to_string(),
            )
        }
    };

    (status, Json(json!({ "error": message }))).into_response()
}

pub(crate) async fn create_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    headers: HeaderMap,
    Json(request): Json<CreateTicketRequest>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: RejectionNotifier + 'static,
{
    let principal = principal_from_headers(&headers);
    match service.submit(principal.as_ref(), request.into()) {
        Ok(item) => (StatusCode::CREATED, Json(json!({ "id": item.id }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    headers: HeaderMap,
    Query(query): Query<TicketQuery>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: RejectionNotifier + 'static,
{
    let principal = principal_from_headers(&headers);
    let filter = TicketFilter::from_query(&query);
    match service.list(principal.as_ref().map(|principal| &principal.id), &filter) {
        Ok(tickets) => (StatusCode::OK, Json(json!({ "tickets": tickets }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn detail_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Path(id): Path<String>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: RejectionNotifier + 'static,
{
    match service.get(&ItemId(id)) {
        Ok(item) => {
            let ticket = ItemView::from(&item);
            (StatusCode::OK, Json(json!({ "ticket": ticket }))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: RejectionNotifier + 'static,
{
    let principal = principal_from_headers(&headers);
    match service.transition(&ItemId(id), principal.as_ref(), request) {
        Ok(result) => {
            let payload = json!({
                "ok": true,
                "statusChanged": result.status_changed(),
                "notification": result.notification,
                "ticket": ItemView::from(&result.item),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn edit_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(edit): Json<ItemEdit>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: RejectionNotifier + 'static,
{
    let principal = principal_from_headers(&headers);
    match service.update_details(&ItemId(id), principal.as_ref(), edit) {
        Ok(item) => {
            let ticket = ItemView::from(&item);
            (StatusCode::OK, Json(json!({ "ticket": ticket }))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn audit_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
    Query(query): Query<AuditQuery>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: RejectionNotifier + 'static,
{
    match service.audit_feed(query.limit) {
        Ok(audits) => (StatusCode::OK, Json(json!({ "audits": audits }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn sweep_handler<R, N>(
    State(service): State<Arc<ReviewService<R, N>>>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: RejectionNotifier + 'static,
{
    match service.reconcile_all() {
        Ok(summary) => {
            let payload = json!({
                "ok": true,
                "updated": summary.updated,
                "failed": summary.failed,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(ReviewError::Repository(err)) => {
            error!(error = %err, "risk reconciliation sweep could not list tickets");
            let payload = json!({ "error": "Failed to update risk" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}
