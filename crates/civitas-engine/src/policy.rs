//! Capability policy.
//!
//! Every role and ownership check in the engine goes through
//! [`can_perform`]. Edge-specific status rules live in the transition table
//! in [`crate::workflow`]; this module only decides whether an actor may
//! attempt a kind of action at all. The blocked flag is handled separately
//! because it has its own error kind.

use civitas_shared::{Actor, Role};
use civitas_store::{Issue, PaymentRecord};

use crate::error::EngineError;

/// Things an actor can ask the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateIssue,
    EditIssue,
    DeleteIssue,
    Upvote,
    Boost,
    SubscribePremium,
    AssignStaff,
    ChangeStatus,
    RejectIssue,
    ViewIssue,
    ListIssues,
    ListOwnIssues,
    ListAssignedIssues,
    ReviewAllIssues,
    ViewPayment,
    ListAllPayments,
    ManageAccounts,
    ViewAdminStats,
    ViewStaffStats,
    ViewCitizenStats,
}

/// What the action targets, when ownership matters.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    None,
    Issue(&'a Issue),
    Payment(&'a PaymentRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// `Deny` becomes [`EngineError::Forbidden`].
    pub fn into_result(self) -> Result<(), EngineError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(EngineError::Forbidden(reason.to_string())),
        }
    }
}

fn require_role(actor: &Actor, role: Role, reason: &'static str) -> Decision {
    if actor.role == role {
        Decision::Allow
    } else {
        Decision::Deny(reason)
    }
}

fn require_reporter(actor: &Actor, resource: Resource<'_>, reason: &'static str) -> Decision {
    match resource {
        Resource::Issue(issue) if issue.reporter_id == actor.id => Decision::Allow,
        _ => Decision::Deny(reason),
    }
}

pub fn can_perform(actor: &Actor, action: Action, resource: Resource<'_>) -> Decision {
    match action {
        Action::ViewIssue | Action::ListIssues => Decision::Allow,

        Action::CreateIssue => require_role(actor, Role::Citizen, "only citizens can report issues"),
        Action::SubscribePremium => {
            require_role(actor, Role::Citizen, "only citizens can subscribe to premium")
        }
        Action::ListOwnIssues | Action::ViewCitizenStats => {
            require_role(actor, Role::Citizen, "citizen access required")
        }

        Action::EditIssue => require_reporter(actor, resource, "only the reporter can edit this issue"),
        Action::DeleteIssue => {
            require_reporter(actor, resource, "only the reporter can delete this issue")
        }
        Action::Boost => require_reporter(actor, resource, "only the reporter can boost this issue"),

        Action::Upvote => {
            if actor.role != Role::Citizen {
                return Decision::Deny("only citizens can upvote");
            }
            match resource {
                Resource::Issue(issue) if issue.reporter_id == actor.id => {
                    Decision::Deny("cannot upvote your own issue")
                }
                Resource::Issue(_) => Decision::Allow,
                _ => Decision::Deny("upvote requires an issue"),
            }
        }

        Action::ChangeStatus | Action::ListAssignedIssues | Action::ViewStaffStats => {
            require_role(actor, Role::Staff, "staff access required")
        }

        Action::AssignStaff
        | Action::RejectIssue
        | Action::ReviewAllIssues
        | Action::ListAllPayments
        | Action::ManageAccounts
        | Action::ViewAdminStats => require_role(actor, Role::Admin, "admin access required"),

        Action::ViewPayment => match resource {
            _ if actor.is_admin() => Decision::Allow,
            Resource::Payment(payment) if payment.actor_id == actor.id => Decision::Allow,
            _ => Decision::Deny("payment belongs to another account"),
        },
    }
}
