use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::auditor::DecisionAuditor;
use crate::domain::approval::{ApprovalId, ApprovalRequest};
use crate::domain::decision::Decision;
use crate::domain::tracking::TrackingRecord;
use crate::errors::ApprovalError;
use crate::store::{ApprovalFilter, ApprovalStats, ApprovalStore, Page, TrackingStore};
use crate::workflow::{apply_decision, build_request, CreateApprovalInput, WorkflowSettings};

pub use crate::bulk::{BulkAction, BulkOutcome};

/// Orchestrates the approval lifecycle over the injected stores.
///
/// Decisions on the same request id are serialized through a keyed async
/// mutex so two concurrent callers cannot both observe `Pending` and both
/// succeed. The tracking record is appended before the status mutation is
/// persisted: a failure in between leaves the request untouched, so there is
/// never a state change without an audit trail.
pub struct ApprovalWorkflow {
    store: Arc<dyn ApprovalStore>,
    tracking: Arc<dyn TrackingStore>,
    auditor: DecisionAuditor,
    settings: WorkflowSettings,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ApprovalWorkflow {
    pub fn new(
        store: Arc<dyn ApprovalStore>,
        tracking: Arc<dyn TrackingStore>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            store,
            tracking,
            auditor: DecisionAuditor,
            settings,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub async fn create(
        &self,
        input: CreateApprovalInput,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let request = build_request(input, &self.settings, Utc::now())?;
        self.store.save(request.clone()).await?;

        tracing::info!(
            event_name = "approval.created",
            approval_id = %request.id,
            document_type = %request.document_type,
            priority = request.priority.as_str(),
            due_at = %request.due_at,
            "approval request created"
        );
        Ok(request)
    }

    pub async fn decide(
        &self,
        id: &ApprovalId,
        decision: Decision,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let lock = self.lock_for(id).await;
        let result = {
            let _held = lock.lock().await;
            self.decide_locked(id, decision).await
        };
        self.release_lock(id, lock).await;
        result
    }

    async fn decide_locked(
        &self,
        id: &ApprovalId,
        decision: Decision,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let request = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApprovalError::NotFound(id.clone()))?;

        let now = Utc::now();
        let outcome = apply_decision(&request, &decision, &self.settings, now)?;
        let record = self.auditor.record(&request, &decision, outcome.action, now);

        // Audit before mutation: a failure here leaves the request untouched.
        self.tracking.append(record).await?;
        self.store.save(outcome.updated.clone()).await?;

        tracing::info!(
            event_name = "approval.decision_applied",
            approval_id = %id,
            action = decision.action.kind(),
            actor = %decision.actor,
            status = outcome.updated.status.as_str(),
            tier = outcome.updated.tier,
            "decision applied"
        );
        Ok(outcome.updated)
    }

    pub async fn get(&self, id: &ApprovalId) -> Result<ApprovalRequest, ApprovalError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApprovalError::NotFound(id.clone()))
    }

    pub async fn list(
        &self,
        filter: &ApprovalFilter,
        page: Page,
    ) -> Result<Vec<ApprovalRequest>, ApprovalError> {
        Ok(self.store.list(filter, page).await?)
    }

    pub async fn stats(&self) -> Result<ApprovalStats, ApprovalError> {
        Ok(self.store.stats(Utc::now()).await?)
    }

    pub async fn history(&self, id: &ApprovalId) -> Result<Vec<TrackingRecord>, ApprovalError> {
        Ok(self.tracking.list_for_approval(id).await?)
    }

    /// Recent correction records for offline generation-quality analysis.
    pub async fn feedback(&self, limit: u32) -> Result<Vec<TrackingRecord>, ApprovalError> {
        Ok(self.tracking.list_feedback(limit).await?)
    }

    async fn lock_for(&self, id: &ApprovalId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id.0.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Returns this caller's handle and evicts the map entry when no other
    /// task holds one, so decided ids do not accumulate entries for the
    /// process lifetime. Holding the map lock while counting keeps `lock_for`
    /// from handing out a clone mid-check.
    async fn release_lock(&self, id: &ApprovalId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks.get(&id.0).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(&id.0);
        }
    }
}
