use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use civitas_engine::reports::{Invoice, PaymentHistory};
use civitas_shared::{Page, PaymentId};
use civitas_store::{MonthlyTotal, PaymentRecord};

use super::issues::ChargeBody;
use super::{AppState, PaymentListParams};
use crate::auth::Caller;
use crate::error::ServerError;

pub(super) async fn subscribe(
    State(state): State<AppState>,
    caller: Caller,
    body: Option<Json<ChargeBody>>,
) -> Result<(StatusCode, Json<PaymentRecord>), ServerError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let mut engine = state.engine.lock().await;
    let payment = engine.subscribe_premium(
        &caller.actor(),
        body.amount,
        body.transaction_ref.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub(super) async fn mine(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<PaymentHistory>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.payment_history(&caller.actor())?))
}

pub(super) async fn invoice(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<PaymentId>,
) -> Result<Json<Invoice>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.invoice(&caller.actor(), id)?))
}

pub(super) async fn admin_list(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<PaymentListParams>,
) -> Result<Json<Page<PaymentRecord>>, ServerError> {
    let (filter, page) = params.into_parts();
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(ServerError::BadRequest("`from` must not be after `to`".into()));
        }
    }
    let engine = state.engine.lock().await;
    Ok(Json(engine.list_payments(&caller.actor(), &filter, page)?))
}

pub(super) async fn admin_monthly(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<MonthlyTotal>>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.monthly_payment_stats(&caller.actor())?))
}
