//! Caller resolution.
//!
//! Token verification happens upstream; the identity gateway forwards the
//! resolved account id in [`ACTOR_HEADER`]. The account is re-read from the
//! store on every request so role and blocked changes apply immediately.
//! Blocked accounts are refused on every authenticated route.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use civitas_engine::EngineError;
use civitas_shared::{Actor, ActorId};
use civitas_store::Account;

use crate::api::AppState;
use crate::error::ServerError;

pub const ACTOR_HEADER: &str = "x-actor-id";

/// The authenticated account behind a request.
#[derive(Debug, Clone)]
pub struct Caller(pub Account);

impl Caller {
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

fn actor_id(parts: &Parts) -> Option<ActorId> {
    parts
        .headers
        .get(ACTOR_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = actor_id(parts).ok_or(ServerError::Unauthenticated)?;
        let account = state
            .engine
            .lock()
            .await
            .find_account(id)?
            .ok_or(ServerError::Unauthenticated)?;
        if account.is_blocked {
            return Err(EngineError::BlockedActor.into());
        }
        Ok(Caller(account))
    }
}
