//! # civitas-engine
//!
//! Issue lifecycle and workflow rules for the civic issue tracker.
//!
//! [`Engine`] owns the [`Database`] and exposes one method per operation.
//! Every mutating method runs as a single `IMMEDIATE` transaction: it
//! re-reads the caller's stored account (so a block applied after the
//! caller was resolved still takes effect), checks the capability policy
//! and the operation's preconditions, performs conditional writes, and
//! appends at most one timeline event. Either all of that lands or none of
//! it does.

pub mod accounts;
pub mod assignment;
pub mod boost;
pub mod error;
pub mod gateway;
pub mod issues;
pub mod policy;
pub mod query;
pub mod reports;
pub mod upvote;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testutil;

use chrono::{DateTime, SubsecRound, Utc};

use civitas_shared::constants::{
    DEFAULT_BOOST_AMOUNT, DEFAULT_PREMIUM_AMOUNT, FREE_ISSUE_QUOTA, MAX_PAGE_LIMIT,
};
use civitas_shared::Actor;
use civitas_store::{ActorStore, Database};

pub use error::{EngineError, Result};
pub use gateway::{ChargeRequest, GatewayError, MockGateway, PaymentGateway, Receipt};
pub use policy::{can_perform, Action, Decision, Resource};

/// Tunables the engine reads at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Lifetime number of issues a non-premium citizen may report.
    pub free_issue_quota: u32,
    pub default_boost_amount: i64,
    pub default_premium_amount: i64,
    pub max_page_limit: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            free_issue_quota: FREE_ISSUE_QUOTA,
            default_boost_amount: DEFAULT_BOOST_AMOUNT,
            default_premium_amount: DEFAULT_PREMIUM_AMOUNT,
            max_page_limit: MAX_PAGE_LIMIT,
        }
    }
}

pub struct Engine {
    db: Database,
    gateway: Box<dyn PaymentGateway>,
    settings: EngineSettings,
}

impl Engine {
    /// Engine backed by the always-succeeding [`MockGateway`].
    pub fn new(db: Database, settings: EngineSettings) -> Self {
        Self::with_gateway(db, settings, Box::new(MockGateway))
    }

    pub fn with_gateway(
        db: Database,
        settings: EngineSettings,
        gateway: Box<dyn PaymentGateway>,
    ) -> Self {
        Self {
            db,
            gateway,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

/// Re-read `actor` from the store and refuse blocked accounts.
///
/// The returned token carries the stored role and flags, not whatever the
/// caller passed in.
pub(crate) fn active_actor<S: ActorStore + ?Sized>(store: &S, actor: &Actor) -> Result<Actor> {
    let account = store
        .get_account(actor.id)?
        .ok_or_else(|| EngineError::InvalidActor(format!("unknown account {}", actor.id)))?;
    if account.is_blocked {
        return Err(EngineError::BlockedActor);
    }
    Ok(account.actor())
}

/// Current time at the precision the store keeps, so values handed back to
/// callers compare equal to what a later read returns.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
