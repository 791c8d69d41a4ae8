use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use civitas_engine::boost::BoostReceipt;
use civitas_engine::issues::{IssueDetail, IssueEdit, NewIssue};
use civitas_shared::constants::DASHBOARD_LATEST;
use civitas_shared::{IssueId, Page};
use civitas_store::Issue;

use super::{AppState, IssueListParams};
use crate::auth::Caller;
use crate::error::ServerError;

pub(super) async fn list(
    State(state): State<AppState>,
    Query(params): Query<IssueListParams>,
) -> Result<Json<Page<Issue>>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.list_issues(&params.into_query())?))
}

#[derive(Deserialize)]
pub(super) struct LatestParams {
    limit: Option<u32>,
}

pub(super) async fn latest_resolved(
    State(state): State<AppState>,
    Query(params): Query<LatestParams>,
) -> Result<Json<Vec<Issue>>, ServerError> {
    let limit = params.limit.unwrap_or(DASHBOARD_LATEST);
    let engine = state.engine.lock().await;
    Ok(Json(engine.latest_resolved(limit)?))
}

pub(super) async fn mine(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<IssueListParams>,
) -> Result<Json<Page<Issue>>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.list_reported_by(&caller.actor(), params.into_query())?))
}

pub(super) async fn detail(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<IssueId>,
) -> Result<Json<IssueDetail>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.issue_detail(id)?))
}

pub(super) async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(new): Json<NewIssue>,
) -> Result<(StatusCode, Json<Issue>), ServerError> {
    let mut engine = state.engine.lock().await;
    let issue = engine.create_issue(&caller.actor(), new)?;
    Ok((StatusCode::CREATED, Json(issue)))
}

pub(super) async fn edit(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<IssueId>,
    Json(edit): Json<IssueEdit>,
) -> Result<Json<Issue>, ServerError> {
    let mut engine = state.engine.lock().await;
    Ok(Json(engine.edit_issue(id, &caller.actor(), edit)?))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<IssueId>,
) -> Result<StatusCode, ServerError> {
    let mut engine = state.engine.lock().await;
    engine.delete_issue(id, &caller.actor())?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpvoteResponse {
    upvote_count: u32,
}

pub(super) async fn upvote(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<IssueId>,
) -> Result<Json<UpvoteResponse>, ServerError> {
    let mut engine = state.engine.lock().await;
    let upvote_count = engine.upvote(id, &caller.actor())?;
    Ok(Json(UpvoteResponse { upvote_count }))
}

/// Optional body for paid operations.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChargeBody {
    pub amount: Option<i64>,
    /// Client-chosen idempotency reference.
    pub transaction_ref: Option<String>,
}

pub(super) async fn boost(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<IssueId>,
    body: Option<Json<ChargeBody>>,
) -> Result<Json<BoostReceipt>, ServerError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let mut engine = state.engine.lock().await;
    let receipt = engine.boost_issue(
        id,
        &caller.actor(),
        body.amount,
        body.transaction_ref.as_deref(),
    )?;
    Ok(Json(receipt))
}
