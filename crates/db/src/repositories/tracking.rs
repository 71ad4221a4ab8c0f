use chrono::{DateTime, Utc};
use sqlx::Row;

use docgate_core::domain::approval::ApprovalId;
use docgate_core::domain::tracking::{TrackingAction, TrackingRecord, TrackingRecordId};
use docgate_core::store::{StoreError, TrackingStore};

use super::{backend, decode};
use crate::DbPool;

pub struct SqlTrackingStore {
    pool: DbPool,
}

impl SqlTrackingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_action(raw: &str) -> Result<TrackingAction, StoreError> {
    match raw {
        "approved" => Ok(TrackingAction::Approved),
        "rejected" => Ok(TrackingAction::Rejected),
        "edited" => Ok(TrackingAction::Edited),
        "rerequested" => Ok(TrackingAction::Rerequested),
        "escalated" => Ok(TrackingAction::Escalated),
        "cancelled" => Ok(TrackingAction::Cancelled),
        other => Err(decode(format!("unknown tracking action `{other}`"))),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| decode(format!("invalid timestamp `{raw}`: {error}")))
}

const SELECT_COLUMNS: &str = "id, approval_id, action, actor, occurred_at, original_content, \
     edited_content, diff, changed_fields, rejection_reason, quality_rating, document_type, \
     change_type, ai_enhanced";

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<TrackingRecord, StoreError> {
    let id: String = row.try_get("id").map_err(decode)?;
    let approval_id: String = row.try_get("approval_id").map_err(decode)?;
    let action_str: String = row.try_get("action").map_err(decode)?;
    let actor: String = row.try_get("actor").map_err(decode)?;
    let occurred_at_str: String = row.try_get("occurred_at").map_err(decode)?;
    let original_content: Option<String> =
        row.try_get("original_content").map_err(decode)?;
    let edited_content: Option<String> = row.try_get("edited_content").map_err(decode)?;
    let diff: Option<String> = row.try_get("diff").map_err(decode)?;
    let changed_fields_json: Option<String> =
        row.try_get("changed_fields").map_err(decode)?;
    let rejection_reason: Option<String> =
        row.try_get("rejection_reason").map_err(decode)?;
    let quality_rating: Option<i64> = row.try_get("quality_rating").map_err(decode)?;
    let document_type: String = row.try_get("document_type").map_err(decode)?;
    let change_type: String = row.try_get("change_type").map_err(decode)?;
    let ai_enhanced: bool = row.try_get("ai_enhanced").map_err(decode)?;

    let changed_fields = changed_fields_json
        .map(|raw| serde_json::from_str::<Vec<String>>(&raw).map_err(decode))
        .transpose()?;
    let quality_rating =
        quality_rating.map(u8::try_from).transpose().map_err(decode)?;

    Ok(TrackingRecord {
        id: TrackingRecordId(id),
        approval_id: ApprovalId(approval_id),
        action: parse_action(&action_str)?,
        actor,
        occurred_at: parse_timestamp(&occurred_at_str)?,
        original_content,
        edited_content,
        diff,
        changed_fields,
        rejection_reason,
        quality_rating,
        document_type,
        change_type,
        ai_enhanced,
    })
}

#[async_trait::async_trait]
impl TrackingStore for SqlTrackingStore {
    async fn append(&self, record: TrackingRecord) -> Result<(), StoreError> {
        let changed_fields_json = record
            .changed_fields
            .as_ref()
            .map(|fields| serde_json::to_string(fields).map_err(decode))
            .transpose()?;

        sqlx::query(
            "INSERT INTO tracking_record
                 (id, approval_id, action, actor, occurred_at, original_content,
                  edited_content, diff, changed_fields, rejection_reason, quality_rating,
                  document_type, change_type, ai_enhanced)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(&record.approval_id.0)
        .bind(record.action.as_str())
        .bind(&record.actor)
        .bind(record.occurred_at.to_rfc3339())
        .bind(&record.original_content)
        .bind(&record.edited_content)
        .bind(&record.diff)
        .bind(&changed_fields_json)
        .bind(&record.rejection_reason)
        .bind(record.quality_rating.map(i64::from))
        .bind(&record.document_type)
        .bind(&record.change_type)
        .bind(record.ai_enhanced)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn list_for_approval(
        &self,
        id: &ApprovalId,
    ) -> Result<Vec<TrackingRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM tracking_record
             WHERE approval_id = ? ORDER BY occurred_at ASC"
        ))
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(row_to_record).collect()
    }

    async fn list_feedback(&self, limit: u32) -> Result<Vec<TrackingRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM tracking_record
             WHERE action IN ('edited', 'rejected', 'rerequested')
             ORDER BY occurred_at DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(row_to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use docgate_core::auditor::DecisionAuditor;
    use docgate_core::domain::decision::{Decision, DecisionAction};
    use docgate_core::domain::tracking::TrackingAction;
    use docgate_core::store::{ApprovalStore, TrackingStore};
    use docgate_core::workflow::{build_request, CreateApprovalInput, WorkflowSettings};

    use super::SqlTrackingStore;
    use crate::repositories::SqlApprovalStore;
    use crate::{connect_memory, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_memory().await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_input() -> CreateApprovalInput {
        CreateApprovalInput {
            ticket: "TK-1001".to_owned(),
            document_type: "stored_procedure".to_owned(),
            object_name: "usp_LoadOrders".to_owned(),
            schema_name: "dbo".to_owned(),
            document_path: "docs/dbo.usp_LoadOrders.docx".to_owned(),
            change_type: "update".to_owned(),
            requested_by: "pipeline".to_owned(),
            priority: docgate_core::domain::approval::Priority::Medium,
            sla_hours: None,
            ai_enhanced: true,
            content: Some("Purpose: loads orders".to_owned()),
        }
    }

    #[tokio::test]
    async fn append_and_list_round_trip_preserves_diff_and_fields() {
        let pool = setup().await;
        let approvals = SqlApprovalStore::new(pool.clone());
        let tracking = SqlTrackingStore::new(pool);

        let request =
            build_request(sample_input(), &WorkflowSettings::default(), Utc::now()).expect("build");
        approvals.save(request.clone()).await.expect("save parent");

        let decision = Decision::new(
            "reviewer@corp",
            DecisionAction::Edit {
                content: "Purpose: loads and validates orders".to_owned(),
                reason: "incomplete".to_owned(),
            },
        );
        let record =
            DecisionAuditor.record(&request, &decision, TrackingAction::Edited, Utc::now());

        tracking.append(record.clone()).await.expect("append");
        let listed = tracking.list_for_approval(&request.id).await.expect("list");

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], record);
        assert!(listed[0].diff.is_some());
        assert_eq!(listed[0].changed_fields, Some(vec!["Purpose".to_owned()]));
    }

    #[tokio::test]
    async fn feedback_filters_actions_and_orders_newest_first() {
        let pool = setup().await;
        let approvals = SqlApprovalStore::new(pool.clone());
        let tracking = SqlTrackingStore::new(pool);

        let request =
            build_request(sample_input(), &WorkflowSettings::default(), Utc::now()).expect("build");
        approvals.save(request.clone()).await.expect("save parent");

        let base = Utc::now();
        let auditor = DecisionAuditor;

        let reject = Decision::new(
            "reviewer@corp",
            DecisionAction::Reject { reason: "wrong schema".to_owned(), required_changes: vec![] },
        );
        tracking
            .append(auditor.record(&request, &reject, TrackingAction::Rejected, base))
            .await
            .expect("append reject");

        let approve = Decision::new("reviewer@corp", DecisionAction::Approve);
        tracking
            .append(auditor.record(
                &request,
                &approve,
                TrackingAction::Approved,
                base + Duration::minutes(1),
            ))
            .await
            .expect("append approve");

        let edit = Decision::new(
            "reviewer@corp",
            DecisionAction::Edit {
                content: "Purpose: better".to_owned(),
                reason: "tidy".to_owned(),
            },
        );
        tracking
            .append(auditor.record(
                &request,
                &edit,
                TrackingAction::Edited,
                base + Duration::minutes(2),
            ))
            .await
            .expect("append edit");

        let feedback = tracking.list_feedback(10).await.expect("feedback");
        assert_eq!(feedback.len(), 2);
        assert_eq!(feedback[0].action, TrackingAction::Edited);
        assert_eq!(feedback[1].action, TrackingAction::Rejected);
    }
}
