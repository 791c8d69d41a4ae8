//! Read-side issue listings.
//!
//! Public, citizen and staff views all go through [`Engine::list_issues`];
//! the personal views only pin the descriptor's scope.

use civitas_shared::{Actor, IssueQuery, IssueScope, IssueStatus, Page, PageRequest};
use civitas_store::{Issue, IssueStore};

use crate::error::{EngineError, Result};
use crate::policy::{can_perform, Action, Resource};
use crate::Engine;

impl Engine {
    pub(crate) fn validate_page(&self, page: PageRequest) -> Result<()> {
        if page.page < 1 {
            return Err(EngineError::Validation("page must be at least 1".into()));
        }
        let max = self.settings.max_page_limit;
        if page.limit < 1 || page.limit > max {
            return Err(EngineError::Validation(format!(
                "limit must be between 1 and {max}"
            )));
        }
        Ok(())
    }

    /// Filter, sort and paginate issues. High-priority issues always come
    /// first, then the requested sort key.
    pub fn list_issues(&self, query: &IssueQuery) -> Result<Page<Issue>> {
        self.validate_page(query.page)?;
        let page = self.db.query_issues(query)?;
        tracing::debug!(
            total = page.total,
            page = page.page,
            returned = page.items.len(),
            "issues listed"
        );
        Ok(page)
    }

    /// Issues reported by `actor`.
    pub fn list_reported_by(&self, actor: &Actor, mut query: IssueQuery) -> Result<Page<Issue>> {
        can_perform(actor, Action::ListOwnIssues, Resource::None).into_result()?;
        query.scope = IssueScope::ReportedBy(actor.id);
        self.list_issues(&query)
    }

    /// Issues assigned to `actor`.
    pub fn list_assigned_to(&self, actor: &Actor, mut query: IssueQuery) -> Result<Page<Issue>> {
        can_perform(actor, Action::ListAssignedIssues, Resource::None).into_result()?;
        query.scope = IssueScope::AssignedTo(actor.id);
        self.list_issues(&query)
    }

    /// Admin console listing: every issue, any filter.
    pub fn list_all_issues(&self, actor: &Actor, mut query: IssueQuery) -> Result<Page<Issue>> {
        can_perform(actor, Action::ReviewAllIssues, Resource::None).into_result()?;
        query.scope = IssueScope::All;
        self.list_issues(&query)
    }

    /// Most recently updated resolved issues. Boosted issues get no head
    /// start here.
    pub fn latest_resolved(&self, limit: u32) -> Result<Vec<Issue>> {
        self.validate_page(PageRequest::new(1, limit))?;
        Ok(self
            .db
            .recently_updated_with_status(IssueStatus::Resolved, limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Harness;
    use civitas_shared::{Category, IssueFilter, IssueSort, Priority, Role};

    fn populate(h: &mut Harness, count: usize) -> Vec<Issue> {
        // Spread reports over citizens to stay inside the free quota.
        let mut issues = Vec::new();
        let mut reporter = h.citizen();
        for i in 0..count {
            if i % 3 == 0 && i > 0 {
                reporter = h.citizen();
            }
            issues.push(h.report(&reporter, &format!("Issue {i:02}")));
        }
        issues
    }

    #[test]
    fn second_page_of_fifteen() {
        let mut h = Harness::new();
        populate(&mut h, 15);

        let query = IssueQuery {
            page: PageRequest::new(2, 10),
            ..Default::default()
        };
        let page = h.engine.list_issues(&query).unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total, 15);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn boosted_issues_lead_every_page_order() {
        let mut h = Harness::new();
        let issues = populate(&mut h, 6);
        let oldest = &issues[0];
        let reporter = h.engine.database().require_issue(oldest.id).unwrap().reporter_id;
        let reporter = Actor {
            id: reporter,
            role: Role::Citizen,
            is_premium: false,
            is_blocked: false,
        };
        h.engine.boost_issue(oldest.id, &reporter, None, None).unwrap();

        for sort in [IssueSort::Newest, IssueSort::Oldest, IssueSort::MostUpvoted] {
            let query = IssueQuery {
                sort,
                ..Default::default()
            };
            let page = h.engine.list_issues(&query).unwrap();
            assert_eq!(page.items[0].id, oldest.id, "{sort:?}");
            assert!(page.items[1..].iter().all(|i| i.priority == Priority::Normal));
        }
    }

    #[test]
    fn page_bounds_validated() {
        let h = Harness::new();
        for page in [PageRequest::new(0, 10), PageRequest::new(1, 0), PageRequest::new(1, 101)] {
            let query = IssueQuery {
                page,
                ..Default::default()
            };
            assert!(matches!(
                h.engine.list_issues(&query),
                Err(EngineError::Validation(_))
            ));
        }
    }

    #[test]
    fn mine_is_scoped_and_filterable() {
        let mut h = Harness::new();
        let me = h.citizen();
        let someone = h.citizen();
        h.report(&me, "Fallen tree");
        h.report(&someone, "Blocked drain");

        let page = h.engine.list_reported_by(&me, IssueQuery::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Fallen tree");

        // The scope cannot be widened by the caller.
        let query = IssueQuery {
            scope: IssueScope::ReportedBy(someone.id),
            filter: IssueFilter {
                category: Some(Category::Road),
                ..Default::default()
            },
            ..Default::default()
        };
        let page = h.engine.list_reported_by(&me, query).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].reporter_id, me.id);
    }

    #[test]
    fn assigned_view_needs_staff() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin = h.admin();
        let staff = h.staff();
        let issue = h.report(&citizen, "Fallen tree");
        h.report(&citizen, "Blocked drain");
        h.engine.assign(issue.id, staff.id, &admin).unwrap();

        let page = h.engine.list_assigned_to(&staff, IssueQuery::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, issue.id);

        assert!(matches!(
            h.engine.list_assigned_to(&citizen, IssueQuery::default()),
            Err(EngineError::Forbidden(_))
        ));
    }

    #[test]
    fn latest_resolved_only_lists_resolved() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin = h.admin();
        let staff = h.staff();
        let done = h.report(&citizen, "Fixed light");
        h.report(&citizen, "Open pothole");
        h.engine.assign(done.id, staff.id, &admin).unwrap();
        for target in [IssueStatus::InProgress, IssueStatus::Working, IssueStatus::Resolved] {
            h.engine.request_transition(done.id, target, &staff).unwrap();
        }

        let resolved = h.engine.latest_resolved(6).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, done.id);
    }

    #[test]
    fn latest_resolved_ignores_boost() {
        let mut h = Harness::new();
        let citizen = h.citizen();
        let admin = h.admin();
        let staff = h.staff();
        let boosted = h.report(&citizen, "Old boosted");
        let plain = h.report(&citizen, "New plain");
        h.engine.boost_issue(boosted.id, &citizen, None, None).unwrap();

        for issue in [&boosted, &plain] {
            h.engine.assign(issue.id, staff.id, &admin).unwrap();
            for target in [IssueStatus::InProgress, IssueStatus::Working, IssueStatus::Resolved] {
                h.engine.request_transition(issue.id, target, &staff).unwrap();
            }
        }

        let titles: Vec<_> = h
            .engine
            .latest_resolved(5)
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, ["New plain", "Old boosted"]);
        assert!(h.engine.latest_resolved(0).is_err());
    }
}
