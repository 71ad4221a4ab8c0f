use thiserror::Error;

use crate::domain::approval::{ApprovalId, ApprovalStatus};

/// Failure taxonomy for the approval workflow.
///
/// `Validation` and `InvalidTransition` are caller mistakes returned with
/// enough detail to correct the request. `Store` aborts the whole operation
/// (audit write plus status mutation) as one unit. `Delivery` is contained in
/// the notification path and must never surface through `decide`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("approval `{0}` not found")]
    NotFound(ApprovalId),
    #[error("cannot apply `{action}` to approval in status `{status:?}`: {detail}")]
    InvalidTransition { status: ApprovalStatus, action: &'static str, detail: String },
    #[error("store failure: {0}")]
    Store(String),
    #[error("delivery failure: {0}")]
    Delivery(String),
}

impl ApprovalError {
    pub fn invalid_transition(
        status: ApprovalStatus,
        action: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition { status, action, detail: detail.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::ApprovalError;
    use crate::domain::approval::{ApprovalId, ApprovalStatus};

    #[test]
    fn invalid_transition_reports_status_and_action() {
        let error = ApprovalError::invalid_transition(
            ApprovalStatus::Approved,
            "reject",
            "request is terminal",
        );

        let rendered = error.to_string();
        assert!(rendered.contains("reject"));
        assert!(rendered.contains("Approved"));
        assert!(rendered.contains("request is terminal"));
    }

    #[test]
    fn not_found_names_the_missing_id() {
        let error = ApprovalError::NotFound(ApprovalId("APR-404".to_owned()));
        assert_eq!(error.to_string(), "approval `APR-404` not found");
    }
}
