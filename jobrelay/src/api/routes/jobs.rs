//! Read-only job inspection routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::JobResponse;
use crate::api::server::AppState;

/// Create the jobs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs))
        .route("/{id}", get(get_job))
}

/// Query parameters for the job list.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Number of most-recent jobs to return (default: 20).
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

/// List the most recently created jobs.
async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<JobResponse>>> {
    let limit = params.limit.clamp(1, 100);
    let jobs = state.store.list_recent(limit).await?;
    Ok(Json(jobs.iter().map(JobResponse::from).collect()))
}

/// Get a single job by id.
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let job = state
        .store
        .get_job(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job with id '{}' not found", id)))?;

    Ok(Json(JobResponse::from(&job)))
}
