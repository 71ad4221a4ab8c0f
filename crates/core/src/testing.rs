//! In-memory store implementations.
//!
//! Used by tests across the workspace and usable as a lightweight backend for
//! local experiments; the durable implementations live in `docgate-db`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::approval::{ApprovalId, ApprovalRequest, ApprovalStatus};
use crate::domain::tracking::TrackingRecord;
use crate::store::{
    ApprovalFilter, ApprovalStats, ApprovalStore, Page, StoreError, TrackingStore,
};
use crate::workflow::is_overdue;

#[derive(Default)]
pub struct InMemoryApprovalStore {
    requests: RwLock<HashMap<String, ApprovalRequest>>,
}

fn matches_filter(request: &ApprovalRequest, filter: &ApprovalFilter) -> bool {
    if let Some(status) = filter.status {
        if request.status != status {
            return false;
        }
    }
    if let Some(document_type) = &filter.document_type {
        if !request.document_type.eq_ignore_ascii_case(document_type) {
            return false;
        }
    }
    if let Some(priority) = filter.priority {
        if request.priority != priority {
            return false;
        }
    }
    if let Some(tier) = filter.tier {
        if request.tier != tier {
            return false;
        }
    }
    if let Some(after) = filter.created_after {
        if request.created_at < after {
            return false;
        }
    }
    if let Some(before) = filter.created_before {
        if request.created_at > before {
            return false;
        }
    }
    true
}

#[async_trait]
impl ApprovalStore for InMemoryApprovalStore {
    async fn find_by_id(&self, id: &ApprovalId) -> Result<Option<ApprovalRequest>, StoreError> {
        Ok(self.requests.read().await.get(&id.0).cloned())
    }

    async fn save(&self, request: ApprovalRequest) -> Result<(), StoreError> {
        self.requests.write().await.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn list(
        &self,
        filter: &ApprovalFilter,
        page: Page,
    ) -> Result<Vec<ApprovalRequest>, StoreError> {
        let requests = self.requests.read().await;
        let mut matched: Vec<ApprovalRequest> =
            requests.values().filter(|request| matches_filter(request, filter)).cloned().collect();
        matched.sort_by(|left, right| {
            right.created_at.cmp(&left.created_at).then_with(|| left.id.0.cmp(&right.id.0))
        });
        Ok(matched
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<ApprovalStats, StoreError> {
        let requests = self.requests.read().await;
        let mut stats = ApprovalStats::default();
        let mut by_priority: HashMap<String, u64> = HashMap::new();
        let mut by_document_type: HashMap<String, u64> = HashMap::new();

        for request in requests.values() {
            match request.status {
                ApprovalStatus::Pending => stats.pending += 1,
                ApprovalStatus::Approved => stats.approved += 1,
                ApprovalStatus::Rejected => stats.rejected += 1,
                ApprovalStatus::Cancelled => stats.cancelled += 1,
            }
            if is_overdue(request, now) {
                stats.overdue += 1;
            }
            *by_priority.entry(request.priority.as_str().to_owned()).or_default() += 1;
            *by_document_type.entry(request.document_type.clone()).or_default() += 1;
        }

        stats.by_priority = sorted_counts(by_priority);
        stats.by_document_type = sorted_counts(by_document_type);
        Ok(stats)
    }
}

fn sorted_counts(counts: HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|left, right| left.0.cmp(&right.0));
    entries
}

#[derive(Default)]
pub struct InMemoryTrackingStore {
    records: RwLock<Vec<TrackingRecord>>,
}

impl InMemoryTrackingStore {
    pub async fn records(&self) -> Vec<TrackingRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl TrackingStore for InMemoryTrackingStore {
    async fn append(&self, record: TrackingRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn list_for_approval(
        &self,
        id: &ApprovalId,
    ) -> Result<Vec<TrackingRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|record| record.approval_id == *id)
            .cloned()
            .collect())
    }

    async fn list_feedback(&self, limit: u32) -> Result<Vec<TrackingRecord>, StoreError> {
        let records = self.records.read().await;
        let mut feedback: Vec<TrackingRecord> =
            records.iter().filter(|record| record.action.is_feedback()).cloned().collect();
        feedback.sort_by(|left, right| right.occurred_at.cmp(&left.occurred_at));
        feedback.truncate(limit as usize);
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{InMemoryApprovalStore, InMemoryTrackingStore};
    use crate::domain::approval::{ApprovalStatus, Priority};
    use crate::store::{ApprovalFilter, ApprovalStore, Page, TrackingStore};
    use crate::workflow::{build_request, CreateApprovalInput, WorkflowSettings};

    fn input(object_name: &str, priority: Priority) -> CreateApprovalInput {
        CreateApprovalInput {
            ticket: "TK-1".to_owned(),
            document_type: "stored_procedure".to_owned(),
            object_name: object_name.to_owned(),
            schema_name: "dbo".to_owned(),
            document_path: format!("docs/dbo.{object_name}.docx"),
            change_type: "new".to_owned(),
            requested_by: "pipeline".to_owned(),
            priority,
            sla_hours: None,
            ai_enhanced: false,
            content: None,
        }
    }

    #[tokio::test]
    async fn list_filters_by_status_and_priority() {
        let store = InMemoryApprovalStore::default();
        let settings = WorkflowSettings::default();
        let now = Utc::now();

        let pending = build_request(input("usp_A", Priority::High), &settings, now).unwrap();
        let mut approved =
            build_request(input("usp_B", Priority::Low), &settings, now).unwrap();
        approved.status = ApprovalStatus::Approved;

        store.save(pending.clone()).await.unwrap();
        store.save(approved).await.unwrap();

        let filter = ApprovalFilter {
            status: Some(ApprovalStatus::Pending),
            priority: Some(Priority::High),
            ..ApprovalFilter::default()
        };
        let listed = store.list(&filter, Page { offset: 0, limit: 50 }).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, pending.id);
    }

    #[tokio::test]
    async fn stats_count_overdue_pending_requests() {
        let store = InMemoryApprovalStore::default();
        let settings = WorkflowSettings::default();
        let created = Utc::now() - Duration::hours(100);

        let overdue = build_request(input("usp_A", Priority::High), &settings, created).unwrap();
        let fresh =
            build_request(input("usp_B", Priority::Low), &settings, Utc::now()).unwrap();
        store.save(overdue).await.unwrap();
        store.save(fresh).await.unwrap();

        let stats = store.stats(Utc::now()).await.unwrap();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.by_priority, vec![("high".to_owned(), 1), ("low".to_owned(), 1)]);
    }

    #[tokio::test]
    async fn feedback_is_newest_first_and_capped() {
        let store = InMemoryTrackingStore::default();
        let settings = WorkflowSettings::default();
        let request =
            build_request(input("usp_A", Priority::Medium), &settings, Utc::now()).unwrap();
        let auditor = crate::auditor::DecisionAuditor;

        let base = Utc::now();
        for (offset, reason) in [(0, "first"), (1, "second"), (2, "third")] {
            let decision = crate::domain::decision::Decision::new(
                "reviewer@corp",
                crate::domain::decision::DecisionAction::Reject {
                    reason: reason.to_owned(),
                    required_changes: vec![],
                },
            );
            let record = auditor.record(
                &request,
                &decision,
                crate::domain::tracking::TrackingAction::Rejected,
                base + Duration::minutes(offset),
            );
            store.append(record).await.unwrap();
        }

        let feedback = store.list_feedback(2).await.unwrap();
        assert_eq!(feedback.len(), 2);
        assert_eq!(feedback[0].rejection_reason.as_deref(), Some("third"));
        assert_eq!(feedback[1].rejection_reason.as_deref(), Some("second"));
    }
}
