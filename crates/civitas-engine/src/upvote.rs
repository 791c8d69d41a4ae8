//! Community upvotes: one per actor per issue, never by the reporter.

use civitas_shared::{Actor, IssueId};
use civitas_store::{AuditLog, IssueStore, TimelineEvent};

use crate::error::{EngineError, Result};
use crate::policy::{can_perform, Action, Resource};
use crate::{active_actor, Engine};

impl Engine {
    /// Record `actor`'s vote and return the new count.
    pub fn upvote(&mut self, issue_id: IssueId, actor: &Actor) -> Result<u32> {
        let count = self.db.mutate(|tx| -> Result<u32> {
            let actor = active_actor(tx, actor)?;
            let issue = tx
                .get_issue(issue_id)?
                .ok_or_else(EngineError::issue_not_found)?;
            can_perform(&actor, Action::Upvote, Resource::Issue(&issue)).into_result()?;

            let now = crate::now();
            let count = tx
                .add_upvoter(issue.id, actor.id, now)?
                .ok_or_else(|| EngineError::Conflict("you have already upvoted this issue".into()))?;
            tx.append_event(&TimelineEvent::new(
                issue.id,
                issue.status,
                "Issue upvoted",
                &actor,
                now,
            ))?;
            Ok(count)
        })?;

        tracing::info!(issue = %issue_id, actor = %actor.id, count, "issue upvoted");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;
    use crate::testutil::Harness;

    #[test]
    fn vote_once_never_self() {
        let mut h = Harness::new();
        let reporter = h.citizen();
        let voter = h.citizen();
        let issue = h.report(&reporter, "Pothole");

        assert_eq!(h.engine.upvote(issue.id, &voter).unwrap(), 1);
        assert!(matches!(
            h.engine.upvote(issue.id, &voter),
            Err(EngineError::Conflict(_))
        ));
        assert!(matches!(
            h.engine.upvote(issue.id, &reporter),
            Err(EngineError::Forbidden(_))
        ));

        let detail = h.engine.issue_detail(issue.id).unwrap();
        assert_eq!(detail.issue.upvote_count, 1);
        assert_eq!(detail.issue.upvoters.len(), 1);
        assert!(detail.issue.upvoters.contains(&voter.id));
        assert_eq!(detail.timeline[0].message, "Issue upvoted");
        assert_eq!(detail.timeline.len(), 2);
    }

    #[test]
    fn count_tracks_voters() {
        let mut h = Harness::new();
        let reporter = h.citizen();
        let issue = h.report(&reporter, "Pothole");

        for expected in 1..=3 {
            let voter = h.citizen();
            assert_eq!(h.engine.upvote(issue.id, &voter).unwrap(), expected);
        }
        let issue = h.engine.issue_detail(issue.id).unwrap().issue;
        assert_eq!(issue.upvote_count as usize, issue.upvoters.len());
    }

    #[test]
    fn blocked_voter_rejected() {
        let mut h = Harness::new();
        let reporter = h.citizen();
        let voter = h.citizen();
        let issue = h.report(&reporter, "Pothole");
        h.block(&voter);

        assert!(matches!(
            h.engine.upvote(issue.id, &voter),
            Err(EngineError::BlockedActor)
        ));
    }

    #[test]
    fn missing_issue() {
        let mut h = Harness::new();
        let voter = h.citizen();
        assert!(matches!(
            h.engine.upvote(IssueId::new(), &voter),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn concurrent_duplicate_votes_count_once() {
        let mut h = Harness::new();
        let reporter = h.citizen();
        let voter = h.citizen();
        let issue = h.report(&reporter, "Pothole");

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let mut engine = h.second_engine();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    engine.upvote(issue.id, &voter)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

        let issue = h.engine.issue_detail(issue.id).unwrap().issue;
        assert_eq!(issue.upvote_count, 1);
        assert_eq!(issue.upvoters.len(), 1);
    }
}
