//! Dispatch routes.
//!
//! The producer side of the queue: accepts relayed `enqueue_job` tool calls
//! and durably records them.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::dispatch::{EnqueueJobAck, EnqueueJobCall};

/// Create the dispatch router.
pub fn router() -> Router<AppState> {
    Router::new().route("/enqueue", post(enqueue_job))
}

/// Validate the tool payload and enqueue the job.
///
/// The job id is producer-assigned: an explicit `id` in the payload is used
/// as-is (a collision is a 409, and the caller must pick a new one), and a
/// UUID is generated otherwise.
async fn enqueue_job(
    State(state): State<AppState>,
    Json(call): Json<EnqueueJobCall>,
) -> ApiResult<(StatusCode, Json<EnqueueJobAck>)> {
    if !call.params.is_object() {
        return Err(ApiError::validation("params must be a JSON object"));
    }

    let job_id = call
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    state.store.enqueue(&job_id, &call.params).await?;

    tracing::info!(job_id = %job_id, "job enqueued via dispatch");

    Ok((StatusCode::ACCEPTED, Json(EnqueueJobAck { job_id })))
}
