pub mod service;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::approval::{ApprovalId, ApprovalRequest, ApprovalStatus, Priority};
use crate::domain::decision::{Decision, DecisionAction};
use crate::domain::tracking::TrackingAction;
use crate::errors::ApprovalError;

pub use service::{ApprovalWorkflow, BulkAction, BulkOutcome};

/// Tier and SLA policy for the workflow.
///
/// `tier_sla_hours` is indexed by tier number minus one; tiers without an
/// entry keep the due timestamp they escalated with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    pub default_sla_hours: u32,
    pub max_tiers: u32,
    pub tier_sla_hours: Vec<u32>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self { default_sla_hours: 72, max_tiers: 3, tier_sla_hours: Vec::new() }
    }
}

impl WorkflowSettings {
    pub fn sla_hours_for_tier(&self, tier: u32) -> Option<u32> {
        let index = tier.checked_sub(1)? as usize;
        self.tier_sla_hours.get(index).copied()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateApprovalInput {
    pub ticket: String,
    pub document_type: String,
    pub object_name: String,
    pub schema_name: String,
    pub document_path: String,
    pub change_type: String,
    pub requested_by: String,
    pub priority: Priority,
    pub sla_hours: Option<u32>,
    pub ai_enhanced: bool,
    pub content: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub updated: ApprovalRequest,
    pub action: TrackingAction,
}

/// Builds a new `Pending` request at tier 1 with `due_at = now + sla`.
pub fn build_request(
    input: CreateApprovalInput,
    settings: &WorkflowSettings,
    now: DateTime<Utc>,
) -> Result<ApprovalRequest, ApprovalError> {
    let mut missing = Vec::new();
    for (field, value) in [
        ("object_name", &input.object_name),
        ("schema_name", &input.schema_name),
        ("document_path", &input.document_path),
        ("requested_by", &input.requested_by),
    ] {
        if value.trim().is_empty() {
            missing.push(field);
        }
    }
    if !missing.is_empty() {
        return Err(ApprovalError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let sla_hours = input.sla_hours.unwrap_or(settings.default_sla_hours);
    if sla_hours == 0 {
        return Err(ApprovalError::Validation("sla_hours must be greater than zero".to_owned()));
    }

    Ok(ApprovalRequest {
        id: ApprovalId(format!("APR-{}", Uuid::new_v4())),
        ticket: input.ticket,
        document_type: input.document_type,
        object_name: input.object_name,
        schema_name: input.schema_name,
        document_path: input.document_path,
        change_type: input.change_type,
        requested_by: input.requested_by,
        priority: input.priority,
        sla_hours,
        tier: 1,
        max_tiers: settings.max_tiers.max(1),
        status: ApprovalStatus::Pending,
        rejection_count: 0,
        edit_count: 0,
        ai_enhanced: input.ai_enhanced,
        content: input.content,
        created_at: now,
        due_at: now + Duration::hours(i64::from(sla_hours)),
        updated_at: now,
    })
}

/// Applies one decision to one request, producing the mutated request and the
/// tracking action to audit. Pure: the caller owns persistence ordering.
pub fn apply_decision(
    request: &ApprovalRequest,
    decision: &Decision,
    settings: &WorkflowSettings,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, ApprovalError> {
    if request.status.is_terminal() {
        return Err(ApprovalError::invalid_transition(
            request.status,
            decision.action.kind(),
            "request is in a terminal state",
        ));
    }

    let mut updated = request.clone();
    updated.updated_at = now;

    let action = match &decision.action {
        DecisionAction::Approve => {
            updated.status = ApprovalStatus::Approved;
            TrackingAction::Approved
        }
        DecisionAction::Reject { reason, .. } => {
            if reason.trim().is_empty() {
                return Err(ApprovalError::Validation(
                    "rejection reason must not be empty".to_owned(),
                ));
            }
            updated.status = ApprovalStatus::Rejected;
            updated.rejection_count += 1;
            TrackingAction::Rejected
        }
        DecisionAction::Edit { content, .. } => {
            if content.trim().is_empty() {
                return Err(ApprovalError::Validation(
                    "edit must supply replacement content".to_owned(),
                ));
            }
            updated.content = Some(content.clone());
            updated.edit_count += 1;
            TrackingAction::Edited
        }
        DecisionAction::Escalate => {
            if request.tier >= request.max_tiers {
                return Err(ApprovalError::invalid_transition(
                    request.status,
                    "escalate",
                    format!("tier {} is already the maximum", request.tier),
                ));
            }
            updated.tier += 1;
            if let Some(hours) = settings.sla_hours_for_tier(updated.tier) {
                updated.due_at = now + Duration::hours(i64::from(hours));
            }
            TrackingAction::Escalated
        }
        DecisionAction::Rerequest { guidance } => {
            if guidance.trim().is_empty() {
                return Err(ApprovalError::Validation(
                    "regeneration request must include guidance".to_owned(),
                ));
            }
            TrackingAction::Rerequested
        }
        DecisionAction::Cancel => {
            updated.status = ApprovalStatus::Cancelled;
            TrackingAction::Cancelled
        }
    };

    Ok(TransitionOutcome { updated, action })
}

pub fn is_overdue(request: &ApprovalRequest, now: DateTime<Utc>) -> bool {
    request.status == ApprovalStatus::Pending && now > request.due_at
}

/// Whole days until the due timestamp, rounded away from zero in both
/// directions: one hour remaining is one day remaining, one hour overdue is
/// one day overdue (-1).
pub fn days_remaining(request: &ApprovalRequest, now: DateTime<Utc>) -> i64 {
    const DAY_SECONDS: i64 = 86_400;
    let seconds = (request.due_at - now).num_seconds();
    if seconds >= 0 {
        (seconds + DAY_SECONDS - 1) / DAY_SECONDS
    } else {
        -((-seconds + DAY_SECONDS - 1) / DAY_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{
        apply_decision, build_request, days_remaining, is_overdue, CreateApprovalInput,
        WorkflowSettings,
    };
    use crate::domain::approval::{ApprovalRequest, ApprovalStatus, Priority};
    use crate::domain::decision::{Decision, DecisionAction};
    use crate::domain::tracking::TrackingAction;
    use crate::errors::ApprovalError;

    fn input() -> CreateApprovalInput {
        CreateApprovalInput {
            ticket: "TK-1001".to_owned(),
            document_type: "stored_procedure".to_owned(),
            object_name: "usp_LoadOrders".to_owned(),
            schema_name: "dbo".to_owned(),
            document_path: "docs/dbo.usp_LoadOrders.docx".to_owned(),
            change_type: "update".to_owned(),
            requested_by: "pipeline".to_owned(),
            priority: Priority::Medium,
            sla_hours: None,
            ai_enhanced: true,
            content: Some("Purpose: loads orders".to_owned()),
        }
    }

    fn pending_request() -> ApprovalRequest {
        build_request(input(), &WorkflowSettings::default(), Utc::now()).expect("valid input")
    }

    #[test]
    fn create_sets_pending_tier_one_and_due_from_sla() {
        let now = Utc::now();
        let request = build_request(input(), &WorkflowSettings::default(), now).expect("create");

        assert_eq!(request.status, ApprovalStatus::Pending);
        assert_eq!(request.tier, 1);
        assert_eq!(request.sla_hours, 72);
        assert_eq!(request.due_at, now + Duration::hours(72));
    }

    #[test]
    fn create_rejects_missing_required_fields() {
        let mut bad = input();
        bad.object_name = "  ".to_owned();
        bad.requested_by = String::new();

        let error = build_request(bad, &WorkflowSettings::default(), Utc::now())
            .expect_err("missing fields must fail");

        assert!(matches!(
            error,
            ApprovalError::Validation(ref message)
                if message.contains("object_name") && message.contains("requested_by")
        ));
    }

    #[test]
    fn approve_moves_to_approved_and_leaves_tier_alone() {
        let request = pending_request();
        let outcome = apply_decision(
            &request,
            &Decision::new("reviewer@corp", DecisionAction::Approve),
            &WorkflowSettings::default(),
            Utc::now(),
        )
        .expect("approve");

        assert_eq!(outcome.updated.status, ApprovalStatus::Approved);
        assert_eq!(outcome.updated.tier, request.tier);
        assert_eq!(outcome.action, TrackingAction::Approved);
    }

    #[test]
    fn decisions_on_terminal_requests_are_rejected() {
        let mut request = pending_request();
        request.status = ApprovalStatus::Approved;

        let error = apply_decision(
            &request,
            &Decision::new("reviewer@corp", DecisionAction::Approve),
            &WorkflowSettings::default(),
            Utc::now(),
        )
        .expect_err("terminal request must reject decisions");

        assert!(matches!(
            error,
            ApprovalError::InvalidTransition { status: ApprovalStatus::Approved, .. }
        ));
    }

    #[test]
    fn reject_requires_a_reason_and_bumps_the_counter() {
        let request = pending_request();

        let error = apply_decision(
            &request,
            &Decision::new(
                "reviewer@corp",
                DecisionAction::Reject { reason: "  ".to_owned(), required_changes: vec![] },
            ),
            &WorkflowSettings::default(),
            Utc::now(),
        )
        .expect_err("empty reason must fail");
        assert!(matches!(error, ApprovalError::Validation(_)));

        let outcome = apply_decision(
            &request,
            &Decision::new(
                "reviewer@corp",
                DecisionAction::Reject {
                    reason: "wrong schema".to_owned(),
                    required_changes: vec!["fix schema".to_owned()],
                },
            ),
            &WorkflowSettings::default(),
            Utc::now(),
        )
        .expect("reject");

        assert_eq!(outcome.updated.status, ApprovalStatus::Rejected);
        assert_eq!(outcome.updated.rejection_count, 1);
    }

    #[test]
    fn edit_keeps_request_pending_and_replaces_content() {
        let request = pending_request();
        let outcome = apply_decision(
            &request,
            &Decision::new(
                "reviewer@corp",
                DecisionAction::Edit {
                    content: "Purpose: loads and validates orders".to_owned(),
                    reason: "incomplete purpose".to_owned(),
                },
            ),
            &WorkflowSettings::default(),
            Utc::now(),
        )
        .expect("edit");

        assert_eq!(outcome.updated.status, ApprovalStatus::Pending);
        assert_eq!(outcome.updated.edit_count, 1);
        assert_eq!(
            outcome.updated.content.as_deref(),
            Some("Purpose: loads and validates orders")
        );
        assert_eq!(outcome.action, TrackingAction::Edited);
    }

    #[test]
    fn escalate_bumps_tier_and_applies_tier_sla_when_configured() {
        let settings = WorkflowSettings {
            default_sla_hours: 72,
            max_tiers: 3,
            tier_sla_hours: vec![72, 24],
        };
        let request = pending_request();
        let now = Utc::now();

        let outcome = apply_decision(
            &request,
            &Decision::new("reviewer@corp", DecisionAction::Escalate),
            &settings,
            now,
        )
        .expect("escalate");

        assert_eq!(outcome.updated.tier, 2);
        assert_eq!(outcome.updated.status, ApprovalStatus::Pending);
        assert_eq!(outcome.updated.due_at, now + Duration::hours(24));
    }

    #[test]
    fn escalate_at_max_tier_is_an_invalid_transition() {
        let mut request = pending_request();
        request.tier = request.max_tiers;

        let error = apply_decision(
            &request,
            &Decision::new("reviewer@corp", DecisionAction::Escalate),
            &WorkflowSettings::default(),
            Utc::now(),
        )
        .expect_err("tier exhausted");

        assert!(matches!(error, ApprovalError::InvalidTransition { action: "escalate", .. }));
    }

    #[test]
    fn overdue_tracks_pending_status_and_due_time() {
        let mut request = pending_request();
        let past_due = request.due_at + Duration::hours(1);

        assert!(is_overdue(&request, past_due));
        assert!(!is_overdue(&request, request.due_at));

        request.status = ApprovalStatus::Approved;
        assert!(!is_overdue(&request, past_due));
    }

    #[test]
    fn sla_72h_scenario_matches_day_arithmetic() {
        let now = Utc::now();
        let request = build_request(input(), &WorkflowSettings::default(), now).expect("create");

        let at_73h = now + Duration::hours(73);
        assert!(is_overdue(&request, at_73h));
        assert_eq!(days_remaining(&request, at_73h), -1);
        assert_eq!(days_remaining(&request, now + Duration::hours(1)), 3);

        let settings = WorkflowSettings {
            default_sla_hours: 72,
            max_tiers: 3,
            tier_sla_hours: vec![72, 24],
        };
        let escalated = apply_decision(
            &request,
            &Decision::new("reviewer@corp", DecisionAction::Escalate),
            &settings,
            at_73h,
        )
        .expect("escalate overdue request");

        assert_eq!(escalated.updated.tier, 2);
        assert_eq!(escalated.updated.status, ApprovalStatus::Pending);
        assert!(!is_overdue(&escalated.updated, at_73h));
    }
}
