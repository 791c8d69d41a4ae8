use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;

// UUID-backed identifiers. Each entity gets its own type so an actor id can
// never be passed where an issue id is expected.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ParseError::InvalidId(s.to_string()))
            }
        }
    };
}

id_type!(
    /// Canonical actor identifier. Upvote dedup, ownership and assignment all
    /// key on this and nothing else.
    ActorId
);
id_type!(IssueId);
id_type!(PaymentId);
id_type!(EventId);

// Closed string-backed enumerations stored as TEXT and sent over the wire
// in the same spelling.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseError::unknown($kind, other)),
                }
            }
        }
    };
}

text_enum!(
    /// Caller role as resolved by the identity boundary.
    Role, "role" {
        Citizen => "citizen",
        Staff => "staff",
        Admin => "admin",
    }
);

text_enum!(
    /// Lifecycle status of an issue. The permitted edges between these live
    /// in the engine's transition table.
    IssueStatus, "status" {
        Pending => "pending",
        InProgress => "in-progress",
        Working => "working",
        Resolved => "resolved",
        Closed => "closed",
        Rejected => "rejected",
    }
);

impl IssueStatus {
    /// `closed` and `rejected` have no outgoing edges.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IssueStatus::Closed | IssueStatus::Rejected)
    }
}

impl Default for IssueStatus {
    fn default() -> Self {
        IssueStatus::Pending
    }
}

text_enum!(
    Priority, "priority" {
        Normal => "normal",
        High => "high",
    }
);

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

text_enum!(
    Category, "category" {
        Road => "road",
        Garbage => "garbage",
        Water => "water",
        Electricity => "electricity",
    }
);

text_enum!(
    PaymentKind, "payment kind" {
        Premium => "premium",
        Boost => "boost",
    }
);

/// Where an issue was observed. Free-text reports carry only an address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl Location {
    pub fn text(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            lat: None,
            lng: None,
        }
    }
}

/// A resolved caller, valid for the duration of one request.
///
/// The engine never trusts `is_blocked` or `is_premium` from this snapshot
/// for a mutation; it re-reads the stored record inside the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
    pub is_premium: bool,
    pub is_blocked: bool,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }
}
