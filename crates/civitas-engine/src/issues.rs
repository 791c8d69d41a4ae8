//! Issue creation, reporter edits and deletion, and the detail view.

use serde::{Deserialize, Serialize};

use civitas_shared::{Actor, Category, IssueId, IssueStatus, Location, Priority};
use civitas_store::{ActorStore, AuditLog, Issue, IssueStore, TimelineEvent};

use crate::error::{EngineError, Result};
use crate::policy::{can_perform, Action, Resource};
use crate::{active_actor, Engine};

/// Reporter-supplied fields of a new issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub location: Location,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub images: Option<Vec<String>>,
    pub location: Option<Location>,
}

impl IssueEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.images.is_none()
            && self.location.is_none()
    }
}

/// An issue together with its timeline, most recent event first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetail {
    pub issue: Issue,
    pub timeline: Vec<TimelineEvent>,
}

fn non_empty(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn require_pending(issue: &Issue, verb: &str) -> Result<()> {
    if issue.status != IssueStatus::Pending {
        return Err(EngineError::Conflict(format!(
            "only pending issues can be {verb}; this one is {}",
            issue.status
        )));
    }
    Ok(())
}

impl Engine {
    /// Report a new issue.
    ///
    /// Non-premium citizens are limited to `free_issue_quota` reports over
    /// their lifetime. The counter lives on the account, is read and bumped
    /// inside the transaction, and deleting an issue does not give a slot back.
    pub fn create_issue(&mut self, actor: &Actor, new: NewIssue) -> Result<Issue> {
        let title = non_empty("title", &new.title)?;
        let description = non_empty("description", &new.description)?;
        let quota = self.settings.free_issue_quota;

        let issue = self.db.mutate(|tx| -> Result<Issue> {
            let actor = active_actor(tx, actor)?;
            can_perform(&actor, Action::CreateIssue, Resource::None).into_result()?;

            if !actor.is_premium {
                let reported = tx.issues_reported(actor.id)?;
                if reported >= u64::from(quota) {
                    return Err(EngineError::QuotaExceeded { limit: quota });
                }
            }

            let now = crate::now();
            let issue = Issue {
                id: IssueId::new(),
                title,
                description,
                category: new.category,
                images: new.images,
                location: new.location,
                status: IssueStatus::Pending,
                priority: Priority::Normal,
                is_boosted: false,
                upvote_count: 0,
                upvoters: Default::default(),
                reporter_id: actor.id,
                assigned_staff_id: None,
                created_at: now,
                updated_at: now,
            };
            tx.insert_issue(&issue)?;
            tx.record_issue_reported(actor.id)?;
            tx.append_event(&TimelineEvent::new(
                issue.id,
                issue.status,
                "Issue created",
                &actor,
                now,
            ))?;
            Ok(issue)
        })?;

        tracing::info!(issue = %issue.id, reporter = %issue.reporter_id, "issue created");
        Ok(issue)
    }

    /// Apply a reporter edit while the issue is still pending.
    pub fn edit_issue(&mut self, issue_id: IssueId, actor: &Actor, edit: IssueEdit) -> Result<Issue> {
        if edit.is_empty() {
            return Err(EngineError::Validation("edit changes no fields".into()));
        }
        let issue = self.db.mutate(|tx| -> Result<Issue> {
            let actor = active_actor(tx, actor)?;
            let mut issue = tx
                .get_issue(issue_id)?
                .ok_or_else(EngineError::issue_not_found)?;
            can_perform(&actor, Action::EditIssue, Resource::Issue(&issue)).into_result()?;
            require_pending(&issue, "edited")?;

            if let Some(title) = &edit.title {
                issue.title = non_empty("title", title)?;
            }
            if let Some(description) = &edit.description {
                issue.description = non_empty("description", description)?;
            }
            if let Some(category) = edit.category {
                issue.category = category;
            }
            if let Some(images) = edit.images {
                issue.images = images;
            }
            if let Some(location) = edit.location {
                issue.location = location;
            }

            let now = crate::now();
            issue.updated_at = now;
            if !tx.update_pending_content(&issue)? {
                return Err(EngineError::Conflict("issue is no longer pending".into()));
            }
            tx.append_event(&TimelineEvent::new(
                issue.id,
                issue.status,
                "Issue updated",
                &actor,
                now,
            ))?;
            Ok(issue)
        })?;

        tracing::info!(issue = %issue.id, "issue updated");
        Ok(issue)
    }

    /// Delete a pending issue. Its timeline is kept and gains a final
    /// "Issue deleted" entry.
    pub fn delete_issue(&mut self, issue_id: IssueId, actor: &Actor) -> Result<()> {
        self.db.mutate(|tx| -> Result<()> {
            let actor = active_actor(tx, actor)?;
            let issue = tx
                .get_issue(issue_id)?
                .ok_or_else(EngineError::issue_not_found)?;
            can_perform(&actor, Action::DeleteIssue, Resource::Issue(&issue)).into_result()?;
            require_pending(&issue, "deleted")?;

            if !tx.delete_pending_issue(issue.id)? {
                return Err(EngineError::Conflict("issue is no longer pending".into()));
            }
            tx.append_event(&TimelineEvent::new(
                issue.id,
                issue.status,
                "Issue deleted",
                &actor,
                crate::now(),
            ))?;
            Ok(())
        })?;

        tracing::info!(issue = %issue_id, "issue deleted");
        Ok(())
    }

    pub fn issue_detail(&self, issue_id: IssueId) -> Result<IssueDetail> {
        let issue = self
            .db
            .get_issue(issue_id)?
            .ok_or_else(EngineError::issue_not_found)?;
        let timeline = self.db.events_for_issue(issue_id)?;
        tracing::debug!(issue = %issue_id, events = timeline.len(), "issue detail");
        Ok(IssueDetail { issue, timeline })
    }
}
