use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::approval::ApprovalId;
use crate::domain::decision::{Decision, DecisionAction};
use crate::workflow::ApprovalWorkflow;

/// Actions permitted in bulk. Edits and escalations stay single-item
/// operations: they carry per-item payloads that make no sense shared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BulkAction {
    Approve,
    Reject { reason: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub successes: Vec<ApprovalId>,
    pub failures: Vec<(ApprovalId, String)>,
}

/// Applies one action to a set of approval ids, one item at a time.
///
/// Deliberately non-atomic: each id goes through the ordinary single-item
/// decide path, a failing id never blocks or rolls back the others, and the
/// returned outcome always lists every id so callers can tell "nothing
/// happened" from "some things happened".
pub struct BulkApprovalCoordinator {
    workflow: Arc<ApprovalWorkflow>,
}

impl BulkApprovalCoordinator {
    pub fn new(workflow: Arc<ApprovalWorkflow>) -> Self {
        Self { workflow }
    }

    pub async fn bulk_apply(
        &self,
        ids: &[ApprovalId],
        action: BulkAction,
        actor: &str,
        comment: Option<String>,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();

        for id in ids {
            let decision_action = match &action {
                BulkAction::Approve => DecisionAction::Approve,
                BulkAction::Reject { reason } => DecisionAction::Reject {
                    reason: reason.clone(),
                    required_changes: Vec::new(),
                },
            };
            let mut decision = Decision::new(actor, decision_action);
            decision.comment = comment.clone();

            match self.workflow.decide(id, decision).await {
                Ok(_) => outcome.successes.push(id.clone()),
                Err(error) => outcome.failures.push((id.clone(), error.to_string())),
            }
        }

        tracing::info!(
            event_name = "approval.bulk_applied",
            total = ids.len(),
            succeeded = outcome.successes.len(),
            failed = outcome.failures.len(),
            "bulk action applied"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{BulkAction, BulkApprovalCoordinator};
    use crate::domain::approval::{ApprovalId, ApprovalStatus, Priority};
    use crate::workflow::{ApprovalWorkflow, CreateApprovalInput, WorkflowSettings};

    fn create_input(object_name: &str) -> CreateApprovalInput {
        CreateApprovalInput {
            ticket: "TK-1001".to_owned(),
            document_type: "stored_procedure".to_owned(),
            object_name: object_name.to_owned(),
            schema_name: "dbo".to_owned(),
            document_path: format!("docs/dbo.{object_name}.docx"),
            change_type: "new".to_owned(),
            requested_by: "pipeline".to_owned(),
            priority: Priority::Medium,
            sla_hours: None,
            ai_enhanced: false,
            content: None,
        }
    }

    async fn seeded_workflow(count: usize) -> (Arc<ApprovalWorkflow>, Vec<ApprovalId>) {
        let store = Arc::new(crate::testing::InMemoryApprovalStore::default());
        let tracking = Arc::new(crate::testing::InMemoryTrackingStore::default());
        let workflow =
            Arc::new(ApprovalWorkflow::new(store, tracking, WorkflowSettings::default()));

        let mut ids = Vec::new();
        for index in 0..count {
            let request = workflow
                .create(create_input(&format!("usp_Proc{index}")))
                .await
                .expect("create");
            ids.push(request.id);
        }
        (workflow, ids)
    }

    #[tokio::test]
    async fn one_bad_id_yields_n_minus_one_successes() {
        let (workflow, mut ids) = seeded_workflow(4).await;
        ids.insert(2, ApprovalId("APR-missing".to_owned()));

        let coordinator = BulkApprovalCoordinator::new(workflow.clone());
        let outcome = coordinator
            .bulk_apply(&ids, BulkAction::Approve, "admin@corp", None)
            .await;

        assert_eq!(outcome.successes.len(), 4);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, ApprovalId("APR-missing".to_owned()));

        for id in &outcome.successes {
            let request = workflow.get(id).await.expect("approved request");
            assert_eq!(request.status, ApprovalStatus::Approved);
        }
    }

    #[tokio::test]
    async fn all_failures_still_return_a_full_result_list() {
        let (workflow, _ids) = seeded_workflow(0).await;
        let bogus = vec![
            ApprovalId("APR-a".to_owned()),
            ApprovalId("APR-b".to_owned()),
        ];

        let coordinator = BulkApprovalCoordinator::new(workflow);
        let outcome = coordinator
            .bulk_apply(
                &bogus,
                BulkAction::Reject { reason: "stale drafts".to_owned() },
                "admin@corp",
                Some("cleanup".to_owned()),
            )
            .await;

        assert!(outcome.successes.is_empty());
        assert_eq!(outcome.failures.len(), 2);
    }
}
