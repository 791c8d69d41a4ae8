use thiserror::Error;

use civitas_shared::IssueStatus;
use civitas_store::StoreError;

/// Errors returned by engine entry points.
///
/// Everything except [`EngineError::Store`] is a caller error carrying a
/// description that can be shown as-is.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Cannot move issue from {from} to {to}")]
    InvalidTransition { from: IssueStatus, to: IssueStatus },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Free issue limit of {limit} reached; subscribe to premium to report more")]
    QuotaExceeded { limit: u32 },

    #[error("Account is blocked")]
    BlockedActor,

    #[error("Payment failed: {0}")]
    PaymentFailure(String),

    #[error("Invalid actor: {0}")]
    InvalidActor(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            // Unique indexes back the duplicate guards, so a constraint that
            // fires here is a lost race against an identical request.
            StoreError::Constraint(msg) => EngineError::Conflict(msg),
            StoreError::NotFound => EngineError::NotFound("Record".into()),
            other => EngineError::Store(other),
        }
    }
}

impl EngineError {
    /// Stable snake_case identifier for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::Forbidden(_) => "forbidden",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::Conflict(_) => "conflict",
            EngineError::QuotaExceeded { .. } => "quota_exceeded",
            EngineError::BlockedActor => "blocked_actor",
            EngineError::PaymentFailure(_) => "payment_failure",
            EngineError::InvalidActor(_) => "invalid_actor",
            EngineError::Validation(_) => "validation",
            EngineError::Store(_) => "internal",
        }
    }

    pub(crate) fn issue_not_found() -> Self {
        EngineError::NotFound("Issue".into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
