use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use civitas_engine::reports::StaffStats;
use civitas_shared::{IssueId, IssueStatus, Page};
use civitas_store::Issue;

use super::{AppState, IssueListParams};
use crate::auth::Caller;
use crate::error::ServerError;

pub(super) async fn assigned(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<IssueListParams>,
) -> Result<Json<Page<Issue>>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.list_assigned_to(&caller.actor(), params.into_query())?))
}

#[derive(Deserialize)]
pub(super) struct StatusChange {
    status: IssueStatus,
}

pub(super) async fn change_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<IssueId>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Issue>, ServerError> {
    let mut engine = state.engine.lock().await;
    Ok(Json(engine.request_transition(id, change.status, &caller.actor())?))
}

pub(super) async fn stats(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<StaffStats>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.staff_stats(&caller.actor())?))
}
