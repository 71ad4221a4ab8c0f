use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::approval::{ApprovalId, ApprovalRequest, ApprovalStatus, Priority};
use crate::domain::tracking::TrackingRecord;
use crate::errors::ApprovalError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<StoreError> for ApprovalError {
    fn from(value: StoreError) -> Self {
        Self::Store(value.to_string())
    }
}

/// Filter for the pending-approvals listing. Every field is optional; unset
/// fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApprovalFilter {
    pub status: Option<ApprovalStatus>,
    pub document_type: Option<String>,
    pub priority: Option<Priority>,
    pub tier: Option<u32>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStats {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub cancelled: u64,
    pub overdue: u64,
    pub by_priority: Vec<(String, u64)>,
    pub by_document_type: Vec<(String, u64)>,
}

/// Durable home of approval requests. The workflow treats this as a simple
/// keyed repository and is the only writer of request status.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn find_by_id(&self, id: &ApprovalId) -> Result<Option<ApprovalRequest>, StoreError>;

    async fn save(&self, request: ApprovalRequest) -> Result<(), StoreError>;

    async fn list(
        &self,
        filter: &ApprovalFilter,
        page: Page,
    ) -> Result<Vec<ApprovalRequest>, StoreError>;

    /// Aggregate counts evaluated against `now` for overdue detection.
    async fn stats(&self, now: DateTime<Utc>) -> Result<ApprovalStats, StoreError>;
}

/// Append-only store of decision tracking records.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn append(&self, record: TrackingRecord) -> Result<(), StoreError>;

    async fn list_for_approval(
        &self,
        id: &ApprovalId,
    ) -> Result<Vec<TrackingRecord>, StoreError>;

    /// Most recent correction records (`edited|rejected|rerequested`),
    /// newest first, capped at `limit`.
    async fn list_feedback(&self, limit: u32) -> Result<Vec<TrackingRecord>, StoreError>;
}
