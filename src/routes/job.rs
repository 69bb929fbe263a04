use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::jobserver::SubmitError;
use crate::services::envelope::{SealedJobRequest, SealedResultPair};

#[derive(Serialize)]
pub struct AddJobResponse {
    pub uid: Uuid,
}

#[derive(Serialize)]
pub struct JobStatusResponse {
    pub encrypted_result: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

/// POST /job/add — open a sealed job request and queue it for execution.
pub async fn add_job(
    State(state): State<AppState>,
    Json(request): Json<SealedJobRequest>,
) -> Response {
    let job = match state.envelope.open(&request) {
        Ok(job) => job,
        Err(e) => {
            warn!(error = %e, "rejected undecodable job request");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match state.jobs.add_job(job) {
        Ok(uid) => {
            debug!(%uid, "job accepted");
            (StatusCode::OK, Json(AddJobResponse { uid })).into_response()
        }
        Err(e @ SubmitError::NotWhitelisted) => {
            error_response(StatusCode::UNAUTHORIZED, e.to_string())
        }
        Err(e @ SubmitError::DuplicateNonce) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ SubmitError::QueueClosed) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// GET /job/status/{job_id} — return the finished result, sealed under the
/// job's single-use nonce. Unknown and still-running jobs both 404.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Response {
    let Some(result) = state.jobs.get_job_result(&job_id) else {
        return error_response(StatusCode::NOT_FOUND, "job not found");
    };

    let serialized = match serde_json::to_vec(&result) {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    match state.envelope.seal_result(&result.job.nonce, &serialized) {
        Ok(encrypted_result) => {
            (StatusCode::OK, Json(JobStatusResponse { encrypted_result })).into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// POST /job/result — decrypt a sealed result pair on behalf of its original
/// requester and return the plaintext result document.
pub async fn return_result(
    State(state): State<AppState>,
    Json(pair): Json<SealedResultPair>,
) -> Response {
    match state.envelope.unveil(&pair) {
        Ok(plaintext) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            plaintext,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "failed to unveil result pair");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}
