//! JSON API for the approval workflow.
//!
//! - `GET  /api/approvals`                — list with filters and paging
//! - `POST /api/approvals`                — submit a document for review
//! - `GET  /api/approvals/stats`          — aggregate queue counts
//! - `POST /api/approvals/bulk`           — approve/reject a set of ids
//! - `GET  /api/approvals/{id}`           — one request with SLA arithmetic
//! - `POST /api/approvals/{id}/decision`  — apply a reviewer decision
//! - `GET  /api/approvals/{id}/history`   — tracking records for one request
//! - `GET  /api/feedback`                 — recent correction records

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docgate_core::bulk::{BulkAction, BulkApprovalCoordinator, BulkOutcome};
use docgate_core::domain::approval::{ApprovalId, ApprovalRequest};
use docgate_core::domain::decision::Decision;
use docgate_core::domain::tracking::TrackingRecord;
use docgate_core::errors::ApprovalError;
use docgate_core::store::{ApprovalFilter, ApprovalStats, Page};
use docgate_core::workflow::{days_remaining, is_overdue, ApprovalWorkflow, CreateApprovalInput};
use docgate_notify::batcher::{BatchCategory, NotificationBatcher};
use docgate_notify::cards::NotificationEvent;

const DEFAULT_FEEDBACK_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<ApprovalWorkflow>,
    pub coordinator: Arc<BulkApprovalCoordinator>,
    pub batcher: Arc<NotificationBatcher>,
    pub max_page_size: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/approvals", get(list_approvals).post(create_approval))
        .route("/api/approvals/stats", get(stats))
        .route("/api/approvals/bulk", post(bulk_apply))
        .route("/api/approvals/{id}", get(get_approval))
        .route("/api/approvals/{id}/decision", post(decide))
        .route("/api/approvals/{id}/history", get(history))
        .route("/api/feedback", get(feedback))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ApprovalView {
    #[serde(flatten)]
    pub request: ApprovalRequest,
    pub days_remaining: i64,
    pub overdue: bool,
}

impl ApprovalView {
    fn at(request: ApprovalRequest, now: DateTime<Utc>) -> Self {
        let days_remaining = days_remaining(&request, now);
        let overdue = is_overdue(&request, now);
        Self { request, days_remaining, overdue }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub document_type: Option<String>,
    pub priority: Option<String>,
    pub tier: Option<u32>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct BulkBody {
    pub ids: Vec<String>,
    pub actor: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub action: BulkAction,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackQuery {
    pub limit: Option<u32>,
}

type ErrorReply = (StatusCode, Json<ApiError>);

fn error_reply(error: ApprovalError) -> ErrorReply {
    let status = match &error {
        ApprovalError::Validation(_) => StatusCode::BAD_REQUEST,
        ApprovalError::NotFound(_) => StatusCode::NOT_FOUND,
        ApprovalError::InvalidTransition { .. } => StatusCode::CONFLICT,
        ApprovalError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        ApprovalError::Delivery(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ApiError { error: error.to_string() }))
}

fn validation_reply(message: impl Into<String>) -> ErrorReply {
    error_reply(ApprovalError::Validation(message.into()))
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, ErrorReply> {
    value
        .parse::<DateTime<Utc>>()
        .map_err(|_| validation_reply(format!("{field} must be an RFC 3339 timestamp")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_approval(
    State(state): State<AppState>,
    Json(input): Json<CreateApprovalInput>,
) -> Result<(StatusCode, Json<ApprovalView>), ErrorReply> {
    let request = state.workflow.create(input).await.map_err(error_reply)?;

    state
        .batcher
        .enqueue(
            BatchCategory::DraftReady,
            NotificationEvent {
                approval_id: request.id.0.clone(),
                document_type: request.document_type.clone(),
                object_name: request.object_name.clone(),
                schema_name: request.schema_name.clone(),
                ticket: request.ticket.clone(),
                description: format!("Documentation draft ({})", request.change_type),
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(ApprovalView::at(request, Utc::now()))))
}

async fn get_approval(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApprovalView>, ErrorReply> {
    let request = state.workflow.get(&ApprovalId(id)).await.map_err(error_reply)?;
    Ok(Json(ApprovalView::at(request, Utc::now())))
}

async fn list_approvals(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ApprovalView>>, ErrorReply> {
    let mut filter = ApprovalFilter {
        document_type: query.document_type,
        tier: query.tier,
        ..Default::default()
    };
    if let Some(status) = &query.status {
        filter.status = Some(status.parse().map_err(validation_reply)?);
    }
    if let Some(priority) = &query.priority {
        filter.priority = Some(priority.parse().map_err(validation_reply)?);
    }
    if let Some(created_after) = &query.created_after {
        filter.created_after = Some(parse_timestamp("created_after", created_after)?);
    }
    if let Some(created_before) = &query.created_before {
        filter.created_before = Some(parse_timestamp("created_before", created_before)?);
    }

    let page = Page {
        offset: query.offset.unwrap_or(0),
        limit: query.limit.unwrap_or(state.max_page_size).min(state.max_page_size),
    };

    let requests = state.workflow.list(&filter, page).await.map_err(error_reply)?;
    let now = Utc::now();
    Ok(Json(requests.into_iter().map(|request| ApprovalView::at(request, now)).collect()))
}

async fn decide(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(decision): Json<Decision>,
) -> Result<Json<ApprovalView>, ErrorReply> {
    if decision.actor.trim().is_empty() {
        return Err(validation_reply("decision actor must not be empty"));
    }

    let updated =
        state.workflow.decide(&ApprovalId(id), decision).await.map_err(error_reply)?;
    Ok(Json(ApprovalView::at(updated, Utc::now())))
}

async fn bulk_apply(
    State(state): State<AppState>,
    Json(body): Json<BulkBody>,
) -> Result<Json<BulkOutcome>, ErrorReply> {
    if body.ids.is_empty() {
        return Err(validation_reply("bulk action requires at least one approval id"));
    }
    if body.actor.trim().is_empty() {
        return Err(validation_reply("bulk action actor must not be empty"));
    }

    let ids: Vec<ApprovalId> = body.ids.into_iter().map(ApprovalId).collect();
    let outcome =
        state.coordinator.bulk_apply(&ids, body.action, &body.actor, body.comment).await;
    Ok(Json(outcome))
}

async fn stats(State(state): State<AppState>) -> Result<Json<ApprovalStats>, ErrorReply> {
    Ok(Json(state.workflow.stats().await.map_err(error_reply)?))
}

async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TrackingRecord>>, ErrorReply> {
    let id = ApprovalId(id);
    // A history request for an unknown id is a 404, not an empty list.
    state.workflow.get(&id).await.map_err(error_reply)?;
    Ok(Json(state.workflow.history(&id).await.map_err(error_reply)?))
}

async fn feedback(
    State(state): State<AppState>,
    Query(query): Query<FeedbackQuery>,
) -> Result<Json<Vec<TrackingRecord>>, ErrorReply> {
    let limit =
        query.limit.unwrap_or(DEFAULT_FEEDBACK_LIMIT).min(state.max_page_size).max(1);
    Ok(Json(state.workflow.feedback(limit).await.map_err(error_reply)?))
}
