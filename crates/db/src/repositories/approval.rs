use chrono::{DateTime, Utc};
use sqlx::Row;

use docgate_core::domain::approval::{ApprovalId, ApprovalRequest, ApprovalStatus, Priority};
use docgate_core::store::{ApprovalFilter, ApprovalStats, ApprovalStore, Page, StoreError};

use super::{backend, decode};
use crate::DbPool;

pub struct SqlApprovalStore {
    pool: DbPool,
}

impl SqlApprovalStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(raw: &str) -> Result<ApprovalStatus, StoreError> {
    match raw {
        "pending" => Ok(ApprovalStatus::Pending),
        "approved" => Ok(ApprovalStatus::Approved),
        "rejected" => Ok(ApprovalStatus::Rejected),
        "cancelled" => Ok(ApprovalStatus::Cancelled),
        other => Err(decode(format!("unknown approval status `{other}`"))),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| decode(format!("invalid timestamp `{raw}`: {error}")))
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalRequest, StoreError> {
    let id: String = row.try_get("id").map_err(decode)?;
    let ticket: String = row.try_get("ticket").map_err(decode)?;
    let document_type: String = row.try_get("document_type").map_err(decode)?;
    let object_name: String = row.try_get("object_name").map_err(decode)?;
    let schema_name: String = row.try_get("schema_name").map_err(decode)?;
    let document_path: String = row.try_get("document_path").map_err(decode)?;
    let change_type: String = row.try_get("change_type").map_err(decode)?;
    let requested_by: String = row.try_get("requested_by").map_err(decode)?;
    let priority_str: String = row.try_get("priority").map_err(decode)?;
    let sla_hours: i64 = row.try_get("sla_hours").map_err(decode)?;
    let tier: i64 = row.try_get("tier").map_err(decode)?;
    let max_tiers: i64 = row.try_get("max_tiers").map_err(decode)?;
    let status_str: String = row.try_get("status").map_err(decode)?;
    let rejection_count: i64 = row.try_get("rejection_count").map_err(decode)?;
    let edit_count: i64 = row.try_get("edit_count").map_err(decode)?;
    let ai_enhanced: bool = row.try_get("ai_enhanced").map_err(decode)?;
    let content: Option<String> = row.try_get("content").map_err(decode)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode)?;
    let due_at_str: String = row.try_get("due_at").map_err(decode)?;
    let updated_at_str: String = row.try_get("updated_at").map_err(decode)?;

    Ok(ApprovalRequest {
        id: ApprovalId(id),
        ticket,
        document_type,
        object_name,
        schema_name,
        document_path,
        change_type,
        requested_by,
        priority: priority_str.parse::<Priority>().map_err(decode)?,
        sla_hours: u32::try_from(sla_hours).map_err(decode)?,
        tier: u32::try_from(tier).map_err(decode)?,
        max_tiers: u32::try_from(max_tiers).map_err(decode)?,
        status: parse_status(&status_str)?,
        rejection_count: u32::try_from(rejection_count).map_err(decode)?,
        edit_count: u32::try_from(edit_count).map_err(decode)?,
        ai_enhanced,
        content,
        created_at: parse_timestamp(&created_at_str)?,
        due_at: parse_timestamp(&due_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

const SELECT_COLUMNS: &str = "id, ticket, document_type, object_name, schema_name, \
     document_path, change_type, requested_by, priority, sla_hours, tier, max_tiers, \
     status, rejection_count, edit_count, ai_enhanced, content, created_at, due_at, updated_at";

enum Bind {
    Text(String),
    Int(i64),
}

fn filter_conditions(filter: &ApprovalFilter) -> (Vec<&'static str>, Vec<Bind>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(status) = filter.status {
        conditions.push("status = ?");
        binds.push(Bind::Text(status.as_str().to_owned()));
    }
    if let Some(document_type) = &filter.document_type {
        conditions.push("LOWER(document_type) = LOWER(?)");
        binds.push(Bind::Text(document_type.clone()));
    }
    if let Some(priority) = filter.priority {
        conditions.push("priority = ?");
        binds.push(Bind::Text(priority.as_str().to_owned()));
    }
    if let Some(tier) = filter.tier {
        conditions.push("tier = ?");
        binds.push(Bind::Int(i64::from(tier)));
    }
    if let Some(after) = filter.created_after {
        conditions.push("created_at >= ?");
        binds.push(Bind::Text(after.to_rfc3339()));
    }
    if let Some(before) = filter.created_before {
        conditions.push("created_at <= ?");
        binds.push(Bind::Text(before.to_rfc3339()));
    }

    (conditions, binds)
}

#[async_trait::async_trait]
impl ApprovalStore for SqlApprovalStore {
    async fn find_by_id(&self, id: &ApprovalId) -> Result<Option<ApprovalRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM approval_request WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, request: ApprovalRequest) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO approval_request
                 (id, ticket, document_type, object_name, schema_name, document_path,
                  change_type, requested_by, priority, sla_hours, tier, max_tiers, status,
                  rejection_count, edit_count, ai_enhanced, content, created_at, due_at,
                  updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 tier = excluded.tier,
                 rejection_count = excluded.rejection_count,
                 edit_count = excluded.edit_count,
                 content = excluded.content,
                 due_at = excluded.due_at,
                 updated_at = excluded.updated_at",
        )
        .bind(&request.id.0)
        .bind(&request.ticket)
        .bind(&request.document_type)
        .bind(&request.object_name)
        .bind(&request.schema_name)
        .bind(&request.document_path)
        .bind(&request.change_type)
        .bind(&request.requested_by)
        .bind(request.priority.as_str())
        .bind(i64::from(request.sla_hours))
        .bind(i64::from(request.tier))
        .bind(i64::from(request.max_tiers))
        .bind(request.status.as_str())
        .bind(i64::from(request.rejection_count))
        .bind(i64::from(request.edit_count))
        .bind(request.ai_enhanced)
        .bind(&request.content)
        .bind(request.created_at.to_rfc3339())
        .bind(request.due_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &ApprovalFilter,
        page: Page,
    ) -> Result<Vec<ApprovalRequest>, StoreError> {
        let (conditions, binds) = filter_conditions(filter);
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM approval_request{where_clause} \
             ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?"
        );

        let mut query = sqlx::query(&sql);
        for bind in binds {
            query = match bind {
                Bind::Text(value) => query.bind(value),
                Bind::Int(value) => query.bind(value),
            };
        }
        let rows = query
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.iter().map(row_to_request).collect()
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<ApprovalStats, StoreError> {
        let mut stats = ApprovalStats::default();

        let status_rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM approval_request GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        for row in &status_rows {
            let status: String = row.try_get("status").map_err(decode)?;
            let count: i64 = row.try_get("count").map_err(decode)?;
            let count = count as u64;
            match parse_status(&status)? {
                ApprovalStatus::Pending => stats.pending = count,
                ApprovalStatus::Approved => stats.approved = count,
                ApprovalStatus::Rejected => stats.rejected = count,
                ApprovalStatus::Cancelled => stats.cancelled = count,
            }
        }

        let overdue: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM approval_request
             WHERE status = 'pending' AND due_at < ?",
        )
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?
        .try_get("count")
        .map_err(decode)?;
        stats.overdue = overdue as u64;

        let priority_rows = sqlx::query(
            "SELECT priority, COUNT(*) AS count FROM approval_request
             GROUP BY priority ORDER BY priority",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        for row in &priority_rows {
            let priority: String = row.try_get("priority").map_err(decode)?;
            let count: i64 = row.try_get("count").map_err(decode)?;
            stats.by_priority.push((priority, count as u64));
        }

        let type_rows = sqlx::query(
            "SELECT document_type, COUNT(*) AS count FROM approval_request
             GROUP BY document_type ORDER BY document_type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        for row in &type_rows {
            let document_type: String = row.try_get("document_type").map_err(decode)?;
            let count: i64 = row.try_get("count").map_err(decode)?;
            stats.by_document_type.push((document_type, count as u64));
        }

        Ok(stats)
    }
}
