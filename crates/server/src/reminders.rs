use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use docgate_core::domain::approval::ApprovalStatus;
use docgate_core::store::{ApprovalFilter, Page};
use docgate_core::workflow::{days_remaining, is_overdue, ApprovalWorkflow};
use docgate_notify::batcher::{BatchCategory, NotificationBatcher};
use docgate_notify::cards::NotificationEvent;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub fn spawn(
    workflow: Arc<ApprovalWorkflow>,
    batcher: Arc<NotificationBatcher>,
    interval_minutes: u32,
    page_size: u32,
) -> JoinHandle<()> {
    let period = Duration::from_secs(u64::from(interval_minutes.max(1)) * 60);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            scan_once(&workflow, &batcher, page_size, Utc::now()).await;
        }
    })
}

/// Queues one reminder event per overdue pending approval. The batcher's
/// window keeps repeated scans from re-sending inside the same day.
pub async fn scan_once(
    workflow: &ApprovalWorkflow,
    batcher: &NotificationBatcher,
    page_size: u32,
    now: DateTime<Utc>,
) -> usize {
    let filter = ApprovalFilter { status: Some(ApprovalStatus::Pending), ..Default::default() };
    let pending = match workflow.list(&filter, Page { offset: 0, limit: page_size }).await {
        Ok(pending) => pending,
        Err(error) => {
            warn!(
                event_name = "reminder.scan_failed",
                error = %error,
                "overdue scan could not list pending approvals"
            );
            return 0;
        }
    };

    let mut queued = 0;
    for request in pending.iter().filter(|request| is_overdue(request, now)) {
        let overdue_days = -days_remaining(request, now);
        batcher
            .enqueue_at(
                BatchCategory::DefectReminder,
                NotificationEvent {
                    approval_id: request.id.0.clone(),
                    document_type: request.document_type.clone(),
                    object_name: request.object_name.clone(),
                    schema_name: request.schema_name.clone(),
                    ticket: request.ticket.clone(),
                    description: format!("Pending review, {overdue_days} day(s) past due"),
                },
                now,
            )
            .await;
        queued += 1;
    }

    debug!(
        event_name = "reminder.scan_complete",
        pending = pending.len(),
        queued,
        "overdue scan finished"
    );
    queued
}
