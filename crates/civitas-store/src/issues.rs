//! Persistence for [`Issue`] records and their upvoters.
//!
//! Every mutating method that guards an invariant carries that guard in its
//! `WHERE` clause and reports whether a row was touched, so a stale read can
//! never turn into a blind overwrite.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use civitas_shared::{ActorId, IssueId, IssueQuery, IssueScope, IssueStatus, Location, Page};

use crate::columns::{encode_time, flag_at, json_at, parsed_at, parsed_opt_at, time_at};
use crate::database::Connected;
use crate::error::{Result, StoreError};
use crate::models::Issue;
use crate::query;

pub(crate) const ISSUE_COLUMNS: &str = "id, title, description, category, images, \
     location_address, location_lat, location_lng, status, priority, is_boosted, \
     upvote_count, reporter_id, assigned_staff_id, created_at, updated_at";

// SQLite's default host parameter limit is 999; stay under it.
const SQLITE_VAR_LIMIT: usize = 900;

pub trait IssueStore: Connected {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    fn insert_issue(&self, issue: &Issue) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            "INSERT INTO issues (id, title, description, category, images,
                                 location_address, location_lat, location_lng,
                                 status, priority, is_boosted, upvote_count,
                                 reporter_id, assigned_staff_id, search_text,
                                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                issue.id.to_string(),
                issue.title,
                issue.description,
                issue.category.as_str(),
                serde_json::to_string(&issue.images)?,
                issue.location.address,
                issue.location.lat,
                issue.location.lng,
                issue.status.as_str(),
                issue.priority.as_str(),
                issue.is_boosted as i32,
                issue.upvoters.len() as i64,
                issue.reporter_id.to_string(),
                issue.assigned_staff_id.map(|s| s.to_string()),
                issue.search_text(),
                encode_time(&issue.created_at),
                encode_time(&issue.updated_at),
            ],
        )?;

        for voter in &issue.upvoters {
            conn.execute(
                "INSERT INTO issue_upvotes (issue_id, actor_id, created_at) VALUES (?1, ?2, ?3)",
                params![
                    issue.id.to_string(),
                    voter.to_string(),
                    encode_time(&issue.created_at)
                ],
            )?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single issue (with its upvoters) by id.
    fn get_issue(&self, id: IssueId) -> Result<Option<Issue>> {
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1");
        let issue = self
            .connection()
            .query_row(&sql, params![id.to_string()], row_to_issue)
            .optional()?;

        match issue {
            Some(issue) => {
                let mut issues = [issue];
                load_upvoters(self.connection(), &mut issues)?;
                let [issue] = issues;
                Ok(Some(issue))
            }
            None => Ok(None),
        }
    }

    fn require_issue(&self, id: IssueId) -> Result<Issue> {
        self.get_issue(id)?.ok_or(StoreError::NotFound)
    }

    fn count_issues_assigned_to(&self, staff: ActorId) -> Result<u64> {
        count(
            self.connection(),
            "SELECT COUNT(*) FROM issues WHERE assigned_staff_id = ?1",
            &staff.to_string(),
        )
    }

    /// Issues assigned to `staff` that were reported at or after `since`.
    fn count_assigned_created_since(&self, staff: ActorId, since: DateTime<Utc>) -> Result<u64> {
        let n: i64 = self.connection().query_row(
            "SELECT COUNT(*) FROM issues WHERE assigned_staff_id = ?1 AND created_at >= ?2",
            params![staff.to_string(), encode_time(&since)],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// Number of issues per status within `scope`. Every status is present
    /// in the result, in [`IssueStatus::ALL`] order.
    fn status_counts(&self, scope: IssueScope) -> Result<Vec<(IssueStatus, u64)>> {
        let (clause, arg) = query::scope_clause(scope);
        let sql = format!(
            "SELECT status, COUNT(*) FROM issues WHERE 1=1{clause} GROUP BY status"
        );

        let mut stmt = self.connection().prepare(&sql)?;
        let rows = match arg {
            Some(arg) => stmt.query_map(params![arg], status_count_row)?,
            None => stmt.query_map([], status_count_row)?,
        };

        let mut counts = HashMap::new();
        for row in rows {
            let (status, n) = row?;
            counts.insert(status, n);
        }

        Ok(IssueStatus::ALL
            .iter()
            .map(|status| (*status, counts.get(status).copied().unwrap_or(0)))
            .collect())
    }

    /// Most recently reported issues, ignoring priority.
    fn recent_issues(&self, limit: u32) -> Result<Vec<Issue>> {
        let sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let rows = stmt.query_map(params![limit], row_to_issue)?;

        let mut issues = Vec::new();
        for row in rows {
            issues.push(row?);
        }
        load_upvoters(self.connection(), &mut issues)?;
        Ok(issues)
    }

    /// Issues in `status`, most recently updated first, ignoring priority.
    fn recently_updated_with_status(&self, status: IssueStatus, limit: u32) -> Result<Vec<Issue>> {
        let sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues
             WHERE status = ?1
             ORDER BY updated_at DESC, rowid DESC
             LIMIT ?2"
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let rows = stmt.query_map(params![status.as_str(), limit], row_to_issue)?;

        let mut issues = Vec::new();
        for row in rows {
            issues.push(row?);
        }
        load_upvoters(self.connection(), &mut issues)?;
        Ok(issues)
    }

    /// Filter / sort / paginate according to a storage-agnostic descriptor.
    fn query_issues(&self, q: &IssueQuery) -> Result<Page<Issue>> {
        let (mut items, total) = query::run_issue_query(self.connection(), q)?;
        load_upvoters(self.connection(), &mut items)?;
        Ok(Page::new(items, total, q.page))
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite the reporter-editable fields, only while the issue is still
    /// pending. Returns `false` if no pending row matched.
    fn update_pending_content(&self, issue: &Issue) -> Result<bool> {
        let affected = self.connection().execute(
            "UPDATE issues
             SET title = ?2, description = ?3, category = ?4, images = ?5,
                 location_address = ?6, location_lat = ?7, location_lng = ?8,
                 search_text = ?9, updated_at = ?10
             WHERE id = ?1 AND status = 'pending'",
            params![
                issue.id.to_string(),
                issue.title,
                issue.description,
                issue.category.as_str(),
                serde_json::to_string(&issue.images)?,
                issue.location.address,
                issue.location.lat,
                issue.location.lng,
                issue.search_text(),
                encode_time(&issue.updated_at),
            ],
        )?;
        Ok(affected > 0)
    }

    /// Compare-and-set on the status column.
    fn update_status(
        &self,
        id: IssueId,
        from: IssueStatus,
        to: IssueStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = self.connection().execute(
            "UPDATE issues SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
            params![id.to_string(), from.as_str(), to.as_str(), encode_time(&at)],
        )?;
        Ok(affected > 0)
    }

    /// Compare-and-set on `assigned_staff_id IS NULL`.
    fn assign_if_unassigned(&self, id: IssueId, staff: ActorId, at: DateTime<Utc>) -> Result<bool> {
        let affected = self.connection().execute(
            "UPDATE issues SET assigned_staff_id = ?2, updated_at = ?3
             WHERE id = ?1 AND assigned_staff_id IS NULL",
            params![id.to_string(), staff.to_string(), encode_time(&at)],
        )?;
        Ok(affected > 0)
    }

    /// Raise priority, conditioned on it still being normal at write time.
    fn boost_if_normal(&self, id: IssueId, at: DateTime<Utc>) -> Result<bool> {
        let affected = self.connection().execute(
            "UPDATE issues SET priority = 'high', is_boosted = 1, updated_at = ?2
             WHERE id = ?1 AND priority = 'normal'",
            params![id.to_string(), encode_time(&at)],
        )?;
        Ok(affected > 0)
    }

    /// Record a vote and bump the counter in the same statement sequence.
    /// Returns the new count, or `None` if `actor` had already voted.
    fn add_upvoter(&self, id: IssueId, actor: ActorId, at: DateTime<Utc>) -> Result<Option<u32>> {
        let conn = self.connection();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO issue_upvotes (issue_id, actor_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![id.to_string(), actor.to_string(), encode_time(&at)],
        )?;
        if inserted == 0 {
            return Ok(None);
        }

        conn.execute(
            "UPDATE issues SET upvote_count = upvote_count + 1, updated_at = ?2 WHERE id = ?1",
            params![id.to_string(), encode_time(&at)],
        )?;
        let count: i64 = conn.query_row(
            "SELECT upvote_count FROM issues WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(Some(count as u32))
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete an issue only while it is pending.  Upvotes cascade; timeline
    /// and payment history are kept.
    fn delete_pending_issue(&self, id: IssueId) -> Result<bool> {
        let affected = self.connection().execute(
            "DELETE FROM issues WHERE id = ?1 AND status = 'pending'",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

impl<T: Connected + ?Sized> IssueStore for T {}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn count(conn: &Connection, sql: &str, arg: &str) -> Result<u64> {
    let n: i64 = conn.query_row(sql, params![arg], |row| row.get(0))?;
    Ok(n as u64)
}

fn status_count_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(IssueStatus, u64)> {
    let status: IssueStatus = parsed_at(row, 0)?;
    let n: i64 = row.get(1)?;
    Ok((status, n as u64))
}

/// Fill `upvoters` for a batch of issues with one query per chunk.
pub(crate) fn load_upvoters(conn: &Connection, issues: &mut [Issue]) -> Result<()> {
    if issues.is_empty() {
        return Ok(());
    }

    let mut index: HashMap<IssueId, usize> = HashMap::with_capacity(issues.len());
    for (i, issue) in issues.iter().enumerate() {
        index.insert(issue.id, i);
    }

    let ids: Vec<String> = issues.iter().map(|i| i.id.to_string()).collect();
    for chunk in ids.chunks(SQLITE_VAR_LIMIT) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let sql = format!(
            "SELECT issue_id, actor_id FROM issue_upvotes WHERE issue_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
            let issue_id: IssueId = parsed_at(row, 0)?;
            let actor_id: ActorId = parsed_at(row, 1)?;
            Ok((issue_id, actor_id))
        })?;

        for row in rows {
            let (issue_id, actor_id) = row?;
            if let Some(&i) = index.get(&issue_id) {
                issues[i].upvoters.insert(actor_id);
            }
        }
    }
    Ok(())
}

/// Map a `rusqlite::Row` selected with [`ISSUE_COLUMNS`] to an [`Issue`].
/// `upvoters` is left empty; see [`load_upvoters`].
pub(crate) fn row_to_issue(row: &rusqlite::Row<'_>) -> rusqlite::Result<Issue> {
    let upvote_count: i64 = row.get(11)?;

    Ok(Issue {
        id: parsed_at(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: parsed_at(row, 3)?,
        images: json_at(row, 4)?,
        location: Location {
            address: row.get(5)?,
            lat: row.get(6)?,
            lng: row.get(7)?,
        },
        status: parsed_at(row, 8)?,
        priority: parsed_at(row, 9)?,
        is_boosted: flag_at(row, 10)?,
        upvote_count: upvote_count as u32,
        upvoters: Default::default(),
        reporter_id: parsed_at(row, 12)?,
        assigned_staff_id: parsed_opt_at(row, 13)?,
        created_at: time_at(row, 14)?,
        updated_at: time_at(row, 15)?,
    })
}
