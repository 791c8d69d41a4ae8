//! The issue status state machine.
//!
//! [`TRANSITIONS`] is the whole graph. [`Engine::request_transition`] is the
//! only code path that changes an issue's status.

use civitas_shared::{Actor, IssueId, IssueStatus};
use civitas_store::{AuditLog, Issue, IssueStore, TimelineEvent};

use crate::error::{EngineError, Result};
use crate::policy::{can_perform, Action, Resource};
use crate::{active_actor, Engine};

/// Who may drive an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRule {
    Admin,
    /// A staff actor whose id equals the issue's `assigned_staff_id`.
    AssignedStaff,
}

impl ActorRule {
    pub fn permits(&self, actor: &Actor, issue: &Issue) -> bool {
        match self {
            ActorRule::Admin => actor.is_admin(),
            ActorRule::AssignedStaff => {
                actor.is_staff() && issue.assigned_staff_id == Some(actor.id)
            }
        }
    }

    fn action(&self) -> Action {
        match self {
            ActorRule::Admin => Action::RejectIssue,
            ActorRule::AssignedStaff => Action::ChangeStatus,
        }
    }
}

/// `from -> [(to, rule)]`. Terminal states have no row.
pub const TRANSITIONS: &[(IssueStatus, &[(IssueStatus, ActorRule)])] = &[
    (
        IssueStatus::Pending,
        &[
            (IssueStatus::Rejected, ActorRule::Admin),
            (IssueStatus::InProgress, ActorRule::AssignedStaff),
        ],
    ),
    (
        IssueStatus::InProgress,
        &[(IssueStatus::Working, ActorRule::AssignedStaff)],
    ),
    (
        IssueStatus::Working,
        &[(IssueStatus::Resolved, ActorRule::AssignedStaff)],
    ),
    (
        IssueStatus::Resolved,
        &[(IssueStatus::Closed, ActorRule::AssignedStaff)],
    ),
];

/// The rule guarding `from -> to`, or `None` if the edge does not exist.
pub fn rule_for(from: IssueStatus, to: IssueStatus) -> Option<ActorRule> {
    TRANSITIONS
        .iter()
        .find(|(state, _)| *state == from)
        .and_then(|(_, edges)| edges.iter().find(|(target, _)| *target == to))
        .map(|(_, rule)| *rule)
}

fn transition_message(to: IssueStatus) -> String {
    match to {
        IssueStatus::Rejected => "Issue rejected by admin".to_string(),
        IssueStatus::InProgress => "Work on the issue has started".to_string(),
        IssueStatus::Working => "Staff are working on the issue".to_string(),
        IssueStatus::Resolved => "Issue marked as resolved".to_string(),
        IssueStatus::Closed => "Issue closed".to_string(),
        IssueStatus::Pending => format!("Status changed to {to}"),
    }
}

impl Engine {
    /// Move an issue along one edge of the status graph.
    ///
    /// Checks run in this order: the issue exists, the edge exists, the
    /// actor satisfies the edge's rule. The status write is conditioned on
    /// the status read at the start, and the timeline entry commits with it.
    pub fn request_transition(
        &mut self,
        issue_id: IssueId,
        target: IssueStatus,
        actor: &Actor,
    ) -> Result<Issue> {
        let issue = self.db.mutate(|tx| -> Result<Issue> {
            let actor = active_actor(tx, actor)?;
            let mut issue = tx
                .get_issue(issue_id)?
                .ok_or_else(EngineError::issue_not_found)?;
            let from = issue.status;

            let rule = rule_for(from, target)
                .ok_or(EngineError::InvalidTransition { from, to: target })?;
            can_perform(&actor, rule.action(), Resource::Issue(&issue)).into_result()?;
            if !rule.permits(&actor, &issue) {
                return Err(EngineError::Forbidden(
                    "only the assigned staff member can update this issue".into(),
                ));
            }

            let now = crate::now();
            if !tx.update_status(issue.id, from, target, now)? {
                return Err(EngineError::Conflict(
                    "issue status changed while updating".into(),
                ));
            }
            tx.append_event(&TimelineEvent::new(
                issue.id,
                target,
                transition_message(target),
                &actor,
                now,
            ))?;

            issue.status = target;
            issue.updated_at = now;
            Ok(issue)
        })?;

        tracing::info!(issue = %issue.id, status = %issue.status, "status changed");
        Ok(issue)
    }

    /// Admin rejection of a pending issue.
    pub fn reject_issue(&mut self, issue_id: IssueId, actor: &Actor) -> Result<Issue> {
        self.request_transition(issue_id, IssueStatus::Rejected, actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Harness;

    #[test]
    fn table_shape() {
        assert_eq!(
            rule_for(IssueStatus::Pending, IssueStatus::Rejected),
            Some(ActorRule::Admin)
        );
        assert_eq!(
            rule_for(IssueStatus::Working, IssueStatus::Resolved),
            Some(ActorRule::AssignedStaff)
        );
        assert_eq!(rule_for(IssueStatus::InProgress, IssueStatus::Resolved), None);
        assert_eq!(rule_for(IssueStatus::InProgress, IssueStatus::Rejected), None);
        for terminal in [IssueStatus::Closed, IssueStatus::Rejected] {
            for to in IssueStatus::ALL {
                assert_eq!(rule_for(terminal, *to), None);
            }
        }
    }

    #[test]
    fn assigned_staff_walks_the_full_lifecycle() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin = h.admin();
        let staff = h.staff();
        let issue = h.report(&citizen, "Streetlight out");
        h.engine.assign(issue.id, staff.id, &admin).unwrap();

        for target in [
            IssueStatus::InProgress,
            IssueStatus::Working,
            IssueStatus::Resolved,
            IssueStatus::Closed,
        ] {
            let updated = h.engine.request_transition(issue.id, target, &staff).unwrap();
            assert_eq!(updated.status, target);
        }

        let detail = h.engine.issue_detail(issue.id).unwrap();
        assert_eq!(detail.issue.status, IssueStatus::Closed);
        // created + assigned + four transitions
        assert_eq!(detail.timeline.len(), 6);
        assert_eq!(detail.timeline[0].status, IssueStatus::Closed);
        assert_eq!(detail.timeline[0].actor_id, staff.id);
    }

    #[test]
    fn skipping_a_state_is_invalid_and_changes_nothing() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin = h.admin();
        let staff = h.staff();
        let issue = h.report(&citizen, "Streetlight out");
        h.engine.assign(issue.id, staff.id, &admin).unwrap();
        h.engine
            .request_transition(issue.id, IssueStatus::InProgress, &staff)
            .unwrap();
        let before = h.engine.issue_detail(issue.id).unwrap().issue;

        let err = h
            .engine
            .request_transition(issue.id, IssueStatus::Resolved, &staff)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: IssueStatus::InProgress,
                to: IssueStatus::Resolved
            }
        ));

        let detail = h.engine.issue_detail(issue.id).unwrap();
        assert_eq!(detail.issue.status, IssueStatus::InProgress);
        assert_eq!(detail.issue.updated_at, before.updated_at);
        assert_eq!(detail.timeline.len(), 3);
    }

    #[test]
    fn unassigned_staff_is_forbidden() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin = h.admin();
        let assigned = h.staff();
        let other = h.staff();
        let issue = h.report(&citizen, "Streetlight out");
        h.engine.assign(issue.id, assigned.id, &admin).unwrap();

        let err = h
            .engine
            .request_transition(issue.id, IssueStatus::InProgress, &other)
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn staff_cannot_start_unassigned_issue() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let staff = h.staff();
        let issue = h.report(&citizen, "Streetlight out");

        let err = h
            .engine
            .request_transition(issue.id, IssueStatus::InProgress, &staff)
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn only_admin_rejects() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin = h.admin();
        let staff = h.staff();
        let issue = h.report(&citizen, "Graffiti");
        h.engine.assign(issue.id, staff.id, &admin).unwrap();

        let err = h.engine.reject_issue(issue.id, &staff).unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        let rejected = h.engine.reject_issue(issue.id, &admin).unwrap();
        assert_eq!(rejected.status, IssueStatus::Rejected);

        let err = h.engine.reject_issue(issue.id, &admin).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[test]
    fn blocked_staff_cannot_transition() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin = h.admin();
        let staff = h.staff();
        let issue = h.report(&citizen, "Graffiti");
        h.engine.assign(issue.id, staff.id, &admin).unwrap();
        h.block(&staff);

        let err = h
            .engine
            .request_transition(issue.id, IssueStatus::InProgress, &staff)
            .unwrap_err();
        assert!(matches!(err, EngineError::BlockedActor));
    }

    #[test]
    fn missing_issue_is_not_found() {
        let mut h = Harness::new();
        let staff = h.staff();
        let err = h
            .engine
            .request_transition(IssueId::new(), IssueStatus::InProgress, &staff)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
