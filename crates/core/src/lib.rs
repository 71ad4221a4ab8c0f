pub mod auditor;
pub mod bulk;
pub mod config;
pub mod domain;
pub mod errors;
pub mod store;
pub mod testing;
pub mod workflow;

pub use auditor::{changed_field_names, positional_diff, DecisionAuditor};
pub use bulk::{BulkAction, BulkApprovalCoordinator, BulkOutcome};
pub use domain::approval::{ApprovalId, ApprovalRequest, ApprovalStatus, Priority};
pub use domain::decision::{Decision, DecisionAction};
pub use domain::tracking::{TrackingAction, TrackingRecord, TrackingRecordId};
pub use errors::ApprovalError;
pub use store::{ApprovalFilter, ApprovalStats, ApprovalStore, Page, StoreError, TrackingStore};
pub use workflow::{
    apply_decision, build_request, days_remaining, is_overdue, ApprovalWorkflow,
    CreateApprovalInput, TransitionOutcome, WorkflowSettings,
};
