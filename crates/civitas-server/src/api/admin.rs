//! Admin console endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use civitas_engine::accounts::NewAccount;
use civitas_engine::reports::AdminStats;
use civitas_shared::{ActorId, IssueId, Page};
use civitas_store::{Account, Issue};

use super::{AppState, IssueListParams};
use crate::auth::Caller;
use crate::error::ServerError;

pub(super) async fn stats(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<AdminStats>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.admin_stats(&caller.actor())?))
}

pub(super) async fn issues(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<IssueListParams>,
) -> Result<Json<Page<Issue>>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.list_all_issues(&caller.actor(), params.into_query())?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AssignRequest {
    staff_id: ActorId,
}

pub(super) async fn assign(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<IssueId>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<Issue>, ServerError> {
    let mut engine = state.engine.lock().await;
    Ok(Json(engine.assign(id, req.staff_id, &caller.actor())?))
}

pub(super) async fn reject(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<IssueId>,
) -> Result<Json<Issue>, ServerError> {
    let mut engine = state.engine.lock().await;
    Ok(Json(engine.reject_issue(id, &caller.actor())?))
}

// -- Accounts --

pub(super) async fn list_staff(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Account>>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.list_staff(&caller.actor())?))
}

pub(super) async fn create_staff(
    State(state): State<AppState>,
    caller: Caller,
    Json(new): Json<NewAccount>,
) -> Result<(StatusCode, Json<Account>), ServerError> {
    let mut engine = state.engine.lock().await;
    let account = engine.create_staff(&caller.actor(), new)?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub(super) async fn delete_staff(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<ActorId>,
) -> Result<StatusCode, ServerError> {
    let mut engine = state.engine.lock().await;
    engine.delete_staff(&caller.actor(), id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_users(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Account>>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.list_citizens(&caller.actor())?))
}

pub(super) async fn toggle_block(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<ActorId>,
) -> Result<Json<Account>, ServerError> {
    let mut engine = state.engine.lock().await;
    Ok(Json(engine.toggle_block(&caller.actor(), id)?))
}
