//! Translation of [`IssueQuery`] / [`PaymentFilter`] descriptors into SQL.

use rusqlite::types::ToSql;
use rusqlite::Connection;

use civitas_shared::{IssueQuery, IssueScope, IssueSort, PaymentFilter};

use crate::columns::encode_time;
use crate::error::Result;
use crate::issues::{row_to_issue, ISSUE_COLUMNS};
use crate::models::Issue;

/// `WHERE` fragment (leading ` AND`) plus its single bound argument.
pub(crate) fn scope_clause(scope: IssueScope) -> (&'static str, Option<String>) {
    match scope {
        IssueScope::All => ("", None),
        IssueScope::ReportedBy(actor) => (" AND reporter_id = ?1", Some(actor.to_string())),
        IssueScope::AssignedTo(staff) => (" AND assigned_staff_id = ?1", Some(staff.to_string())),
    }
}

fn order_clause(sort: IssueSort) -> &'static str {
    // High priority always leads.
    match sort {
        IssueSort::Newest => {
            "ORDER BY CASE priority WHEN 'high' THEN 0 ELSE 1 END, created_at DESC, rowid DESC"
        }
        IssueSort::Oldest => {
            "ORDER BY CASE priority WHEN 'high' THEN 0 ELSE 1 END, created_at ASC, rowid ASC"
        }
        IssueSort::MostUpvoted => {
            "ORDER BY CASE priority WHEN 'high' THEN 0 ELSE 1 END, upvote_count DESC, created_at DESC, rowid DESC"
        }
        IssueSort::RecentlyUpdated => {
            "ORDER BY CASE priority WHEN 'high' THEN 0 ELSE 1 END, updated_at DESC, rowid DESC"
        }
    }
}

/// Build the shared `WHERE` clause for the count and the page query.
fn issue_where(q: &IssueQuery) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses: Vec<&'static str> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    match q.scope {
        IssueScope::All => {}
        IssueScope::ReportedBy(actor) => {
            clauses.push("reporter_id = ?");
            params.push(Box::new(actor.to_string()));
        }
        IssueScope::AssignedTo(staff) => {
            clauses.push("assigned_staff_id = ?");
            params.push(Box::new(staff.to_string()));
        }
    }

    if let Some(status) = q.filter.status {
        clauses.push("status = ?");
        params.push(Box::new(status.as_str()));
    }
    if let Some(category) = q.filter.category {
        clauses.push("category = ?");
        params.push(Box::new(category.as_str()));
    }
    if let Some(priority) = q.filter.priority {
        clauses.push("priority = ?");
        params.push(Box::new(priority.as_str()));
    }
    if let Some(term) = q.filter.search_term() {
        // instr() keeps `%` and `_` in the term literal, unlike LIKE.
        clauses.push("instr(search_text, ?) > 0");
        params.push(Box::new(term.to_lowercase()));
    }

    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (sql, params)
}

/// Run the count and the page query for `q`. Upvoters are not loaded.
pub(crate) fn run_issue_query(conn: &Connection, q: &IssueQuery) -> Result<(Vec<Issue>, u64)> {
    let (where_sql, mut params) = issue_where(q);

    let count_sql = format!("SELECT COUNT(*) FROM issues{where_sql}");
    let param_refs: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();
    let total: i64 = conn.query_row(&count_sql, param_refs.as_slice(), |row| row.get(0))?;

    let offset = i64::try_from(q.page.offset()).unwrap_or(i64::MAX);
    let page_sql = format!(
        "SELECT {ISSUE_COLUMNS} FROM issues{where_sql} {} LIMIT ? OFFSET ?",
        order_clause(q.sort)
    );
    params.push(Box::new(i64::from(q.page.limit)));
    params.push(Box::new(offset));

    let param_refs: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();
    let mut stmt = conn.prepare(&page_sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), row_to_issue)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok((items, total as u64))
}

/// `WHERE` clause for payment listings and aggregates.
pub(crate) fn payment_where(filter: &PaymentFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses: Vec<&'static str> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(kind) = filter.kind {
        clauses.push("kind = ?");
        params.push(Box::new(kind.as_str()));
    }
    if let Some(actor) = filter.actor {
        clauses.push("actor_id = ?");
        params.push(Box::new(actor.to_string()));
    }
    if let Some(from) = filter.from {
        clauses.push("created_at >= ?");
        params.push(Box::new(encode_time(&from)));
    }
    if let Some(to) = filter.to {
        clauses.push("created_at <= ?");
        params.push(Box::new(encode_time(&to)));
    }

    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (sql, params)
}
