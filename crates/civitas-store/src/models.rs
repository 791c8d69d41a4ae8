//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use civitas_shared::{
    Actor, ActorId, Category, EventId, IssueId, IssueStatus, Location, PaymentId, PaymentKind,
    Priority, Role,
};

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A stored actor profile. The identity boundary resolves callers to one of
/// these and the engine re-reads it on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: ActorId,
    pub name: String,
    /// Unique, compared case-insensitively.
    pub email: String,
    pub photo: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub is_premium: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// The capability token for this account as of the time it was read.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
            is_premium: self.is_premium,
            is_blocked: self.is_blocked,
        }
    }
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// A reported civic problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub description: String,
    pub category: Category,
    /// Ordered image URIs, stored as a JSON array.
    pub images: Vec<String>,
    pub location: Location,
    pub status: IssueStatus,
    pub priority: Priority,
    /// Mirrors `priority == High`; the schema rejects rows where they differ.
    pub is_boosted: bool,
    pub upvote_count: u32,
    pub upvoters: BTreeSet<ActorId>,
    /// Owning actor; never changes after creation.
    pub reporter_id: ActorId,
    pub assigned_staff_id: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Lower-cased haystack for free-text search: title, description,
    /// category and location joined with a separator no term can contain.
    pub fn search_text(&self) -> String {
        [
            self.title.as_str(),
            self.description.as_str(),
            self.category.as_str(),
            self.location.address.as_str(),
        ]
        .join("\u{1f}")
        .to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// One immutable audit record of a lifecycle-affecting action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: EventId,
    pub issue_id: IssueId,
    /// Issue status right after the action.
    pub status: IssueStatus,
    pub message: String,
    pub actor_id: ActorId,
    pub actor_role: Role,
    pub created_at: DateTime<Utc>,
}

impl TimelineEvent {
    pub fn new(
        issue_id: IssueId,
        status: IssueStatus,
        message: impl Into<String>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            issue_id,
            status,
            message: message.into(),
            actor_id: actor.id,
            actor_role: actor.role,
            created_at: at,
        }
    }
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

/// A settled charge. Never updated once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub actor_id: ActorId,
    /// Set for boosts, absent for premium subscriptions.
    pub issue_id: Option<IssueId>,
    /// Minor currency units.
    pub amount: i64,
    pub kind: PaymentKind,
    /// Unique per logical charge.
    pub transaction_ref: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Payment totals for one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub total: i64,
    pub count: u64,
}

/// Sum and counts over a filtered set of payments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTotals {
    pub total_amount: i64,
    pub count: u64,
    pub premium_count: u64,
    pub boost_count: u64,
}
