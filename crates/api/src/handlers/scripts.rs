//! Handlers for script executions.
//!
//! Thin wrappers over [`ExecutionOrchestrator`]: request validation here,
//! lifecycle semantics there.
//!
//! [`ExecutionOrchestrator`]: scriptd_core::scripting::orchestrator::ExecutionOrchestrator

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use scriptd_core::types::DbId;

use crate::error::AppResult;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /scripts`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateScriptRequest {
    /// Shell text, run as a script file by the configured interpreter.
    #[validate(length(min = 1, max = 65536, message = "command must be 1 to 65536 characters"))]
    pub command: String,
    /// Kill the script after this many seconds. Overrides the server default.
    #[validate(range(min = 1))]
    pub deadline_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// POST /scripts
// ---------------------------------------------------------------------------

/// Start a script. Responds once the process is running.
pub async fn create_script(
    State(state): State<AppState>,
    Json(input): Json<CreateScriptRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let record = match input.deadline_secs {
        Some(secs) => {
            state
                .orchestrator
                .create_with_deadline(&input.command, Some(Duration::from_secs(secs)))
                .await?
        }
        None => state.orchestrator.create(&input.command).await?,
    };

    tracing::info!(script_id = record.id, pid = ?record.pid, "Script created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

// ---------------------------------------------------------------------------
// GET /scripts
// ---------------------------------------------------------------------------

/// List scripts oldest-first.
pub async fn list_scripts(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let (offset, limit) = params.resolve()?;
    let records = state.orchestrator.get_all(offset, limit).await?;
    Ok(Json(DataResponse { data: records }))
}

// ---------------------------------------------------------------------------
// GET /scripts/{id}
// ---------------------------------------------------------------------------

pub async fn get_script(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let record = state.orchestrator.get(id).await?;
    Ok(Json(DataResponse { data: record }))
}

// ---------------------------------------------------------------------------
// POST /scripts/{id}/stop
// ---------------------------------------------------------------------------

/// Stop a running script. 409 if it is not running.
pub async fn stop_script(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.orchestrator.stop(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// DELETE /scripts/{id}
// ---------------------------------------------------------------------------

/// Delete a script, killing it first if it is still running.
pub async fn delete_script(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.orchestrator.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
