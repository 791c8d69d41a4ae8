//! Payment gateway seam.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

use civitas_shared::{ActorId, IssueId, PaymentKind};

use crate::error::EngineError;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

impl From<GatewayError> for EngineError {
    fn from(err: GatewayError) -> Self {
        EngineError::PaymentFailure(err.0)
    }
}

/// One charge the engine wants settled.
#[derive(Debug, Clone)]
pub struct ChargeRequest<'a> {
    pub actor: ActorId,
    pub kind: PaymentKind,
    pub issue: Option<IssueId>,
    pub amount: i64,
    /// Caller-supplied idempotency reference. When set, the gateway must
    /// settle under exactly this reference.
    pub reference: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_ref: String,
}

/// Settles charges. Called inside the engine's write transaction, after all
/// preconditions have passed and before any payment row is written.
pub trait PaymentGateway: Send {
    fn charge(&self, request: &ChargeRequest<'_>) -> Result<Receipt, GatewayError>;
}

/// Always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockGateway;

impl MockGateway {
    /// `TXN` + epoch millis + 9 random upper-case alphanumerics.
    pub fn mint_reference() -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect();
        format!("TXN{}{}", Utc::now().timestamp_millis(), suffix)
    }
}

impl PaymentGateway for MockGateway {
    fn charge(&self, request: &ChargeRequest<'_>) -> Result<Receipt, GatewayError> {
        let transaction_ref = match request.reference {
            Some(reference) => reference.to_string(),
            None => Self::mint_reference(),
        };
        tracing::debug!(
            actor = %request.actor,
            kind = %request.kind,
            amount = request.amount,
            transaction_ref = %transaction_ref,
            "mock charge settled"
        );
        Ok(Receipt { transaction_ref })
    }
}
