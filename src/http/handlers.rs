//! API request handlers.
//!
//! Each handler is a thin adapter: decode the request, call the service,
//! encode the result. Errors go through `ApiError`.
//!
//! Operations that write fragments, the active config or coordinator state
//! run on their own task. A timed-out or disconnected request drops only the
//! wait, never the operation between install and rollback.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;

use crate::coordinator::{ReleaseOutcome, ReloadReport};
use crate::error::{ConductorError, ConductorResult};
use crate::health::HealthStatus;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::model::{ChangeSetId, ChangeSetStatus, RouteBatch};
use crate::service::{MutationOutcome, RegenerateOutcome, ServiceStatus};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    #[serde(default = "default_outcome")]
    pub outcome: ReleaseOutcome,
}

fn default_outcome() -> ReleaseOutcome {
    ReleaseOutcome::Success
}

#[derive(Debug, Serialize)]
pub struct ChangeSetReply {
    pub id: ChangeSetId,
    pub status: ChangeSetStatus,
}

/// Run `operation` to completion on a spawned task and wait for it.
async fn detached<T, F>(operation: F) -> Result<T, ApiError>
where
    F: Future<Output = ConductorResult<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(operation).await {
        Ok(result) => Ok(result?),
        Err(e) => Err(ConductorError::Aborted(e.to_string()).into()),
    }
}

pub async fn add_or_update_routes(
    State(state): State<AppState>,
    Json(batch): Json<RouteBatch>,
) -> ApiResult<MutationOutcome> {
    let service = state.service.clone();
    let outcome = detached(async move { service.add_or_update_routes(batch).await }).await?;
    Ok(Json(outcome))
}

pub async fn remove_routes(
    State(state): State<AppState>,
    Json(batch): Json<RouteBatch>,
) -> ApiResult<MutationOutcome> {
    let service = state.service.clone();
    let outcome = detached(async move { service.remove_routes(batch).await }).await?;
    Ok(Json(outcome))
}

pub async fn regenerate_config(State(state): State<AppState>) -> ApiResult<RegenerateOutcome> {
    let service = state.service.clone();
    Ok(Json(detached(async move { service.regenerate_config().await }).await?))
}

pub async fn lock_for_reload(State(state): State<AppState>) -> ApiResult<Value> {
    let service = state.service.clone();
    detached(async move { service.lock_for_reload().await }).await?;
    Ok(Json(json!({ "locked": true })))
}

pub async fn reload(State(state): State<AppState>) -> ApiResult<ReloadReport> {
    let service = state.service.clone();
    Ok(Json(detached(async move { service.reload().await }).await?))
}

pub async fn release_reload_lock(
    State(state): State<AppState>,
    Json(request): Json<ReleaseRequest>,
) -> ApiResult<Value> {
    let service = state.service.clone();
    detached(async move { service.release_reload_lock(request.outcome).await }).await?;
    Ok(Json(json!({ "locked": false })))
}

pub async fn query_change_set(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ChangeSetReply> {
    let id = ChangeSetId::new(id)?;
    let status = state.service.query_change_set_status(&id).await;
    Ok(Json(ChangeSetReply { id, status }))
}

pub async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(state.service.status().await)
}

pub async fn set_live(State(state): State<AppState>) -> ApiResult<Value> {
    state.service.set_live()?;
    Ok(Json(json!({ "live": true })))
}

pub async fn set_not_live(State(state): State<AppState>) -> ApiResult<Value> {
    state.service.set_not_live()?;
    Ok(Json(json!({ "live": false })))
}

pub async fn start_proxy(State(state): State<AppState>) -> ApiResult<Value> {
    state.service.start_proxy().await?;
    Ok(Json(json!({ "started": true })))
}

pub async fn kill_proxy(State(state): State<AppState>) -> ApiResult<Value> {
    state.service.kill_proxy().await?;
    Ok(Json(json!({ "killed": true })))
}

pub async fn health(State(state): State<AppState>) -> StatusCode {
    match state.service.health_probe() {
        HealthStatus::Ok => StatusCode::OK,
        HealthStatus::NotReady => StatusCode::NOT_FOUND,
    }
}
