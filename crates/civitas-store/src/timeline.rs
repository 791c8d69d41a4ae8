//! Append-only audit log of lifecycle events.

use rusqlite::params;

use civitas_shared::IssueId;

use crate::columns::{encode_time, parsed_at, time_at};
use crate::database::Connected;
use crate::error::Result;
use crate::models::TimelineEvent;

/// There is deliberately no update or delete here.
pub trait AuditLog: Connected {
    fn append_event(&self, event: &TimelineEvent) -> Result<()> {
        self.connection().execute(
            "INSERT INTO timeline_events (id, issue_id, status, message, actor_id, actor_role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.id.to_string(),
                event.issue_id.to_string(),
                event.status.as_str(),
                event.message,
                event.actor_id.to_string(),
                event.actor_role.as_str(),
                encode_time(&event.created_at),
            ],
        )?;
        Ok(())
    }

    /// Events for one issue, most recent first. Ties on timestamp fall back
    /// to insertion order.
    fn events_for_issue(&self, issue_id: IssueId) -> Result<Vec<TimelineEvent>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, issue_id, status, message, actor_id, actor_role, created_at
             FROM timeline_events
             WHERE issue_id = ?1
             ORDER BY seq DESC",
        )?;
        let rows = stmt.query_map(params![issue_id.to_string()], row_to_event)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }
}

impl<T: Connected + ?Sized> AuditLog for T {}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimelineEvent> {
    Ok(TimelineEvent {
        id: parsed_at(row, 0)?,
        issue_id: parsed_at(row, 1)?,
        status: parsed_at(row, 2)?,
        message: row.get(3)?,
        actor_id: parsed_at(row, 4)?,
        actor_role: parsed_at(row, 5)?,
        created_at: time_at(row, 6)?,
    })
}
