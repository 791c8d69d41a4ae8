use axum::{extract::State, http::StatusCode, Json};

use civitas_engine::accounts::NewAccount;
use civitas_engine::reports::CitizenStats;
use civitas_store::Account;

use super::AppState;
use crate::auth::Caller;
use crate::error::ServerError;

/// Open citizen sign-up. The identity gateway links its subject to the
/// returned account id.
pub(super) async fn register(
    State(state): State<AppState>,
    Json(new): Json<NewAccount>,
) -> Result<(StatusCode, Json<Account>), ServerError> {
    let mut engine = state.engine.lock().await;
    let account = engine.register_citizen(new)?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub(super) async fn me(Caller(account): Caller) -> Json<Account> {
    Json(account)
}

pub(super) async fn citizen_stats(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<CitizenStats>, ServerError> {
    let engine = state.engine.lock().await;
    Ok(Json(engine.citizen_stats(&caller.actor())?))
}
