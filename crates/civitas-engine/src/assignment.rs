//! Binding staff members to issues.
//!
//! An issue is assigned at most once. There is no unassign operation, so
//! whoever is assigned owns the issue for the rest of its life and a staff
//! account with assignments cannot be removed.

use civitas_shared::{Actor, ActorId, IssueId, Role};
use civitas_store::{ActorStore, AuditLog, Connected, Issue, IssueStore, TimelineEvent};

use crate::error::{EngineError, Result};
use crate::policy::{can_perform, Action, Resource};
use crate::{active_actor, Engine};

/// Refuse while any issue still names `staff_id` as its assignee.
pub(crate) fn ensure_unassigned<S: Connected + ?Sized>(store: &S, staff_id: ActorId) -> Result<()> {
    let assigned = store.count_issues_assigned_to(staff_id)?;
    if assigned > 0 {
        return Err(EngineError::Conflict(format!(
            "staff member still has {assigned} assigned issue(s)"
        )));
    }
    Ok(())
}

impl Engine {
    pub fn assign(&mut self, issue_id: IssueId, staff_id: ActorId, actor: &Actor) -> Result<Issue> {
        let issue = self.db.mutate(|tx| -> Result<Issue> {
            let actor = active_actor(tx, actor)?;
            can_perform(&actor, Action::AssignStaff, Resource::None).into_result()?;

            let mut issue = tx
                .get_issue(issue_id)?
                .ok_or_else(EngineError::issue_not_found)?;
            if issue.assigned_staff_id.is_some() {
                return Err(EngineError::Conflict("issue is already assigned".into()));
            }

            let staff = tx
                .get_account(staff_id)?
                .ok_or_else(|| EngineError::InvalidActor(format!("no account {staff_id}")))?;
            if staff.role != Role::Staff {
                return Err(EngineError::InvalidActor(format!(
                    "{} is not a staff member",
                    staff.name
                )));
            }
            if staff.is_blocked {
                return Err(EngineError::InvalidActor(format!(
                    "{} is blocked",
                    staff.name
                )));
            }

            let now = crate::now();
            if !tx.assign_if_unassigned(issue.id, staff.id, now)? {
                return Err(EngineError::Conflict("issue is already assigned".into()));
            }
            tx.append_event(&TimelineEvent::new(
                issue.id,
                issue.status,
                format!("Issue assigned to {}", staff.name),
                &actor,
                now,
            ))?;

            issue.assigned_staff_id = Some(staff.id);
            issue.updated_at = now;
            Ok(issue)
        })?;

        tracing::info!(issue = %issue.id, staff = %staff_id, "staff assigned");
        Ok(issue)
    }

    /// Succeeds only when no issue is assigned to `staff_id`.
    pub fn guard_deletion(&self, staff_id: ActorId) -> Result<()> {
        ensure_unassigned(&self.db, staff_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;
    use crate::testutil::Harness;
    use civitas_shared::IssueStatus;

    #[test]
    fn assign_once() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin = h.admin();
        let s1 = h.staff();
        let s2 = h.staff();
        let issue = h.report(&citizen, "Overflowing drain");

        let assigned = h.engine.assign(issue.id, s1.id, &admin).unwrap();
        assert_eq!(assigned.assigned_staff_id, Some(s1.id));

        let err = h.engine.assign(issue.id, s2.id, &admin).unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));

        let detail = h.engine.issue_detail(issue.id).unwrap();
        assert_eq!(detail.issue.assigned_staff_id, Some(s1.id));
        assert_eq!(detail.timeline.len(), 2);
        assert!(detail.timeline[0].message.starts_with("Issue assigned to"));
        assert_eq!(detail.timeline[0].status, IssueStatus::Pending);
    }

    #[test]
    fn target_must_be_active_staff() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin = h.admin();
        let blocked = h.staff();
        h.block(&blocked);
        let issue = h.report(&citizen, "Overflowing drain");

        let err = h.engine.assign(issue.id, citizen.id, &admin).unwrap_err();
        assert!(matches!(err, EngineError::InvalidActor(_)));
        let err = h.engine.assign(issue.id, blocked.id, &admin).unwrap_err();
        assert!(matches!(err, EngineError::InvalidActor(_)));
        let err = h.engine.assign(issue.id, ActorId::new(), &admin).unwrap_err();
        assert!(matches!(err, EngineError::InvalidActor(_)));

        assert!(h.engine.issue_detail(issue.id).unwrap().issue.assigned_staff_id.is_none());
    }

    #[test]
    fn only_admin_assigns() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let staff = h.staff();
        let issue = h.report(&citizen, "Overflowing drain");

        let err = h.engine.assign(issue.id, staff.id, &staff).unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn missing_issue() {
        let mut h = Harness::new();
        let admin = h.admin();
        let staff = h.staff();
        let err = h.engine.assign(IssueId::new(), staff.id, &admin).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn guard_blocks_while_assigned() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin = h.admin();
        let staff = h.staff();
        let idle = h.staff();
        let issue = h.report(&citizen, "Overflowing drain");
        h.engine.assign(issue.id, staff.id, &admin).unwrap();

        assert!(matches!(
            h.engine.guard_deletion(staff.id),
            Err(EngineError::Conflict(_))
        ));
        h.engine.guard_deletion(idle.id).unwrap();
    }

    #[test]
    fn racing_admins_assign_exactly_once() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin_a = h.admin();
        let admin_b = h.admin();
        let s1 = h.staff();
        let s2 = h.staff();
        let issue = h.report(&citizen, "Collapsed wall");

        let engines = vec![
            (h.second_engine(), admin_a, s1.id),
            (h.second_engine(), admin_b, s2.id),
        ];
        let barrier = Arc::new(Barrier::new(engines.len()));

        let handles: Vec<_> = engines
            .into_iter()
            .map(|(mut engine, admin, staff)| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    engine.assign(issue.id, staff, &admin)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(EngineError::Conflict(_))))
            .count();
        assert_eq!((winners, conflicts), (1, 1));

        let detail = h.engine.issue_detail(issue.id).unwrap();
        assert!(detail.issue.assigned_staff_id.is_some());
        assert_eq!(detail.timeline.len(), 2);
    }
}
