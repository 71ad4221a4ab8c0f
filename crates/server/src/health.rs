use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use docgate_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Total approval requests on record; absent when the store check failed.
    pub approvals_tracked: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub checked_at: DateTime<Utc>,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/healthz", get(health)).with_state(HealthState { db_pool })
}

/// Readiness check against the approval store. Counting `approval_request`
/// rows only succeeds once the connection works and migrations have run, so
/// a fresh but unmigrated database reports degraded rather than ready.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let checked_at = Utc::now();
    let response = match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM approval_request")
        .fetch_one(&state.db_pool)
        .await
    {
        Ok(count) => HealthResponse {
            status: HealthStatus::Ready,
            approvals_tracked: Some(count),
            detail: None,
            checked_at,
        },
        Err(error) => HealthResponse {
            status: HealthStatus::Degraded,
            approvals_tracked: None,
            detail: Some(format!("approval store unavailable: {error}")),
            checked_at,
        },
    };

    let code = match response.status {
        HealthStatus::Ready => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(response))
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use docgate_db::{connect_memory, migrations};

    use super::{health, HealthState, HealthStatus};

    #[tokio::test]
    async fn health_reports_ready_with_request_count_once_migrated() {
        let pool = connect_memory().await.expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, HealthStatus::Ready);
        assert_eq!(payload.approvals_tracked, Some(0));
        assert!(payload.detail.is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn health_degrades_on_an_unmigrated_database() {
        let pool = connect_memory().await.expect("pool should connect");

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, HealthStatus::Degraded);
        assert!(payload.approvals_tracked.is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn health_degrades_when_the_database_is_unavailable() {
        let pool = connect_memory().await.expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, HealthStatus::Degraded);
        assert!(payload.detail.expect("detail").contains("approval store unavailable"));
    }
}
