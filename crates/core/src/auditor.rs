use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::approval::ApprovalRequest;
use crate::domain::decision::{Decision, DecisionAction};
use crate::domain::tracking::{TrackingAction, TrackingRecord, TrackingRecordId};

/// Builds the append-only tracking record for every decision and computes the
/// content diff that feeds the generation-quality feedback loop.
#[derive(Clone, Debug, Default)]
pub struct DecisionAuditor;

impl DecisionAuditor {
    pub fn record(
        &self,
        request: &ApprovalRequest,
        decision: &Decision,
        action: TrackingAction,
        occurred_at: DateTime<Utc>,
    ) -> TrackingRecord {
        let (original_content, edited_content, rejection_reason) = match &decision.action {
            DecisionAction::Edit { content, .. } => {
                (request.content.clone(), Some(content.clone()), None)
            }
            DecisionAction::Reject { reason, .. } => (None, None, Some(reason.clone())),
            _ => (None, None, None),
        };

        let diff = match (&original_content, &edited_content) {
            (Some(original), Some(edited)) => positional_diff(original, edited),
            (None, Some(edited)) => positional_diff("", edited),
            _ => None,
        };
        let changed_fields = diff.as_deref().map(|_| {
            changed_field_names(
                original_content.as_deref().unwrap_or(""),
                edited_content.as_deref().unwrap_or(""),
            )
        });

        TrackingRecord {
            id: TrackingRecordId(Uuid::new_v4().to_string()),
            approval_id: request.id.clone(),
            action,
            actor: decision.actor.clone(),
            occurred_at,
            original_content,
            edited_content,
            diff,
            changed_fields,
            rejection_reason,
            quality_rating: quality_rating(action),
            document_type: request.document_type.clone(),
            change_type: request.change_type.clone(),
            ai_enhanced: request.ai_enhanced,
        }
    }
}

/// Coarse quality signal derived from how the human disposed of the draft.
/// An untouched approval scores highest; a rejection lowest.
fn quality_rating(action: TrackingAction) -> Option<u8> {
    match action {
        TrackingAction::Approved => Some(5),
        TrackingAction::Edited => Some(3),
        TrackingAction::Rerequested => Some(2),
        TrackingAction::Rejected => Some(1),
        TrackingAction::Escalated | TrackingAction::Cancelled => None,
    }
}

/// Line-oriented positional diff: lines are aligned by index, not by content.
///
/// Pairs of differing lines are reported as `Line N: - old / + new`; indices
/// present only in the longer sequence get `(added)` or `(removed)` markers.
/// Comparison trims each line, so indentation-only churn is ignored. This is
/// deliberately not an LCS diff: the goal is to surface which positions a
/// human habitually corrects, not to produce an applicable patch.
pub fn positional_diff(original: &str, edited: &str) -> Option<String> {
    if original == edited {
        return None;
    }

    let original_lines: Vec<&str> = original.lines().collect();
    let edited_lines: Vec<&str> = edited.lines().collect();
    let shared = original_lines.len().min(edited_lines.len());

    let mut out = Vec::new();
    for index in 0..shared {
        let before = original_lines[index].trim();
        let after = edited_lines[index].trim();
        if before != after {
            let line_no = index + 1;
            out.push(format!("Line {line_no}: - {before}"));
            out.push(format!("Line {line_no}: + {after}"));
        }
    }
    for (index, line) in edited_lines.iter().enumerate().skip(shared) {
        out.push(format!("Line {} (added): + {}", index + 1, line.trim()));
    }
    for (index, line) in original_lines.iter().enumerate().skip(shared) {
        out.push(format!("Line {} (removed): - {}", index + 1, line.trim()));
    }

    if out.is_empty() {
        // Contents differ but only in whitespace; still report the edit.
        return Some("(whitespace-only changes)".to_owned());
    }
    Some(out.join("\n"))
}

/// Names of `Field: value` headed lines touched by an edit, in document
/// order, deduplicated.
pub fn changed_field_names(original: &str, edited: &str) -> Vec<String> {
    let original_lines: Vec<&str> = original.lines().collect();
    let edited_lines: Vec<&str> = edited.lines().collect();
    let shared = original_lines.len().min(edited_lines.len());

    let mut fields = Vec::new();
    let mut push_field = |line: &str| {
        if let Some(name) = field_name(line) {
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
    };

    for index in 0..shared {
        if original_lines[index].trim() != edited_lines[index].trim() {
            push_field(original_lines[index]);
            push_field(edited_lines[index]);
        }
    }
    for line in edited_lines.iter().skip(shared) {
        push_field(line);
    }
    for line in original_lines.iter().skip(shared) {
        push_field(line);
    }

    fields
}

fn field_name(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let (name, _) = trimmed.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.len() > 64 {
        return None;
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-' | '/' | '(' | ')'));
    valid.then(|| name.to_owned())
}
