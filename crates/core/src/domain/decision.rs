use serde::{Deserialize, Serialize};

/// Closed union of everything a reviewer can do to a pending request.
///
/// Validation that depends on payload shape (non-empty rejection reason,
/// edit with actual content) lives in the state machine so callers get a
/// typed error instead of a silently ignored decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Reject {
        reason: String,
        #[serde(default)]
        required_changes: Vec<String>,
    },
    Edit {
        content: String,
        reason: String,
    },
    Escalate,
    Rerequest {
        guidance: String,
    },
    Cancel,
}

impl DecisionAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject { .. } => "reject",
            Self::Edit { .. } => "edit",
            Self::Escalate => "escalate",
            Self::Rerequest { .. } => "rerequest",
            Self::Cancel => "cancel",
        }
    }
}

/// Common envelope shared by every decision shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub actor: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub action: DecisionAction,
}

impl Decision {
    pub fn new(actor: impl Into<String>, action: DecisionAction) -> Self {
        Self { actor: actor.into(), comment: None, action }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
