use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::approval::ApprovalId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackingRecordId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingAction {
    Approved,
    Rejected,
    Edited,
    Rerequested,
    Escalated,
    Cancelled,
}

impl TrackingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Edited => "edited",
            Self::Rerequested => "rerequested",
            Self::Escalated => "escalated",
            Self::Cancelled => "cancelled",
        }
    }

    /// Actions that carry a correction signal for the generation pipeline.
    pub fn is_feedback(&self) -> bool {
        matches!(self, Self::Edited | Self::Rejected | Self::Rerequested)
    }
}

/// Append-only audit entry written for every decision.
///
/// `diff` is present only when the decision actually changed the artifact
/// content; `changed_fields` names the document fields touched by the diff so
/// systematic corrections can be surfaced without re-parsing diffs offline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub id: TrackingRecordId,
    pub approval_id: ApprovalId,
    pub action: TrackingAction,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
    pub original_content: Option<String>,
    pub edited_content: Option<String>,
    pub diff: Option<String>,
    pub changed_fields: Option<Vec<String>>,
    pub rejection_reason: Option<String>,
    pub quality_rating: Option<u8>,
    pub document_type: String,
    pub change_type: String,
    pub ai_enhanced: bool,
}
