//! The payment ledger.
//!
//! Records are insert-only. `transaction_ref` is UNIQUE and partial unique
//! indexes allow at most one boost per issue and one premium per actor, so a
//! replayed charge fails with [`StoreError::Constraint`] instead of being
//! recorded twice.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, OptionalExtension};

use civitas_shared::{Page, PageRequest, PaymentFilter, PaymentId};

use crate::columns::{encode_time, parsed_at, parsed_opt_at, time_at};
use crate::database::Connected;
use crate::error::{Result, StoreError};
use crate::models::{MonthlyTotal, PaymentRecord, PaymentTotals};
use crate::query::payment_where;

const PAYMENT_COLUMNS: &str = "id, actor_id, issue_id, amount, kind, transaction_ref, created_at";

pub trait PaymentLedger: Connected {
    fn insert_payment(&self, payment: &PaymentRecord) -> Result<()> {
        self.connection().execute(
            "INSERT INTO payments (id, actor_id, issue_id, amount, kind, transaction_ref, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                payment.id.to_string(),
                payment.actor_id.to_string(),
                payment.issue_id.map(|i| i.to_string()),
                payment.amount,
                payment.kind.as_str(),
                payment.transaction_ref,
                encode_time(&payment.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentRecord>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1");
        Ok(self
            .connection()
            .query_row(&sql, params![id.to_string()], row_to_payment)
            .optional()?)
    }

    /// Newest first, paginated.
    fn query_payments(&self, filter: &PaymentFilter, page: PageRequest) -> Result<Page<PaymentRecord>> {
        let conn = self.connection();
        let (where_sql, mut params) = payment_where(filter);

        let count_sql = format!("SELECT COUNT(*) FROM payments{where_sql}");
        let refs: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();
        let total: i64 = conn.query_row(&count_sql, refs.as_slice(), |row| row.get(0))?;

        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments{where_sql}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ? OFFSET ?"
        );
        params.push(Box::new(i64::from(page.limit)));
        params.push(Box::new(i64::try_from(page.offset()).unwrap_or(i64::MAX)));

        let refs: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(refs.as_slice(), row_to_payment)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(Page::new(items, total as u64, page))
    }

    fn payment_totals(&self, filter: &PaymentFilter) -> Result<PaymentTotals> {
        let (where_sql, params) = payment_where(filter);
        let sql = format!(
            "SELECT COALESCE(SUM(amount), 0),
                    COUNT(*),
                    COALESCE(SUM(kind = 'premium'), 0),
                    COALESCE(SUM(kind = 'boost'), 0)
             FROM payments{where_sql}"
        );
        let refs: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();

        Ok(self
            .connection()
            .query_row(&sql, refs.as_slice(), |row| {
                Ok(PaymentTotals {
                    total_amount: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                    premium_count: row.get::<_, i64>(2)? as u64,
                    boost_count: row.get::<_, i64>(3)? as u64,
                })
            })?)
    }

    /// Totals for the `months` calendar months ending with the one containing
    /// `now`, oldest first. Months without payments are present with zeros.
    fn monthly_totals(&self, months: u32, now: DateTime<Utc>) -> Result<Vec<MonthlyTotal>> {
        if months == 0 {
            return Ok(Vec::new());
        }

        let this_month = now
            .date_naive()
            .with_day(1)
            .ok_or_else(|| StoreError::Calendar("invalid calendar date".into()))?;
        let first = this_month
            .checked_sub_months(Months::new(months - 1))
            .ok_or_else(|| StoreError::Calendar("month window out of range".into()))?;
        let since = first
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(|| StoreError::Calendar("invalid calendar date".into()))?;

        let mut stmt = self.connection().prepare(
            "SELECT substr(created_at, 1, 7) AS ym, SUM(amount), COUNT(*)
             FROM payments
             WHERE created_at >= ?1
             GROUP BY ym",
        )?;
        let rows = stmt.query_map(params![encode_time(&since)], |row| {
            let ym: String = row.get(0)?;
            let total: i64 = row.get(1)?;
            let count: i64 = row.get(2)?;
            Ok((ym, total, count as u64))
        })?;

        let mut by_month = HashMap::new();
        for row in rows {
            let (ym, total, count) = row?;
            by_month.insert(ym, (total, count));
        }

        let mut out = Vec::with_capacity(months as usize);
        let mut cursor = first;
        for _ in 0..months {
            let key = format!("{:04}-{:02}", cursor.year(), cursor.month());
            let (total, count) = by_month.get(&key).copied().unwrap_or((0, 0));
            out.push(MonthlyTotal {
                year: cursor.year(),
                month: cursor.month(),
                total,
                count,
            });
            cursor = match cursor.checked_add_months(Months::new(1)) {
                Some(next) => next,
                None => break,
            };
        }
        Ok(out)
    }
}

impl<T: Connected + ?Sized> PaymentLedger for T {}

fn row_to_payment(row: &rusqlite::Row<'_>) -> rusqlite::Result<PaymentRecord> {
    Ok(PaymentRecord {
        id: parsed_at(row, 0)?,
        actor_id: parsed_at(row, 1)?,
        issue_id: parsed_opt_at(row, 2)?,
        amount: row.get(3)?,
        kind: parsed_at(row, 4)?,
        transaction_ref: row.get(5)?,
        created_at: time_at(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{sample_issue, seed_account};
    use crate::{Database, IssueStore};
    use civitas_shared::{ActorId, IssueId, PaymentKind, Role};

    fn payment(actor: ActorId, issue: Option<IssueId>, kind: PaymentKind, reference: &str) -> PaymentRecord {
        PaymentRecord {
            id: PaymentId::new(),
            actor_id: actor,
            issue_id: issue,
            amount: if kind == PaymentKind::Boost { 100 } else { 1000 },
            kind,
            transaction_ref: reference.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_reference_rejected() {
        let db = Database::open_in_memory().unwrap();
        let a = ActorId::new();
        let b = ActorId::new();
        db.insert_payment(&payment(a, None, PaymentKind::Premium, "TXN1"))
            .unwrap();
        let err = db
            .insert_payment(&payment(b, None, PaymentKind::Premium, "TXN1"))
            .unwrap_err();
        assert!(err.is_constraint());
    }

    #[test]
    fn one_boost_per_issue() {
        let db = Database::open_in_memory().unwrap();
        let reporter = seed_account(&db, Role::Citizen);
        let issue = sample_issue(reporter, "Pothole");
        db.insert_issue(&issue).unwrap();

        db.insert_payment(&payment(reporter, Some(issue.id), PaymentKind::Boost, "TXN1"))
            .unwrap();
        let err = db
            .insert_payment(&payment(reporter, Some(issue.id), PaymentKind::Boost, "TXN2"))
            .unwrap_err();
        assert!(err.is_constraint());
        let boosts = PaymentFilter {
            kind: Some(PaymentKind::Boost),
            ..Default::default()
        };
        assert_eq!(db.payment_totals(&boosts).unwrap().count, 1);
    }

    #[test]
    fn boost_requires_issue() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .insert_payment(&payment(ActorId::new(), None, PaymentKind::Boost, "TXN1"))
            .unwrap_err();
        assert!(err.is_constraint());
    }

    #[test]
    fn totals_and_filters() {
        let db = Database::open_in_memory().unwrap();
        let reporter = seed_account(&db, Role::Citizen);
        let issue = sample_issue(reporter, "Pothole");
        db.insert_issue(&issue).unwrap();

        db.insert_payment(&payment(reporter, None, PaymentKind::Premium, "TXN1"))
            .unwrap();
        db.insert_payment(&payment(reporter, Some(issue.id), PaymentKind::Boost, "TXN2"))
            .unwrap();

        let totals = db.payment_totals(&PaymentFilter::default()).unwrap();
        assert_eq!(totals.total_amount, 1100);
        assert_eq!(totals.count, 2);
        assert_eq!(totals.premium_count, 1);
        assert_eq!(totals.boost_count, 1);

        let filter = PaymentFilter {
            kind: Some(PaymentKind::Boost),
            ..Default::default()
        };
        let page = db.query_payments(&filter, PageRequest::new(1, 10)).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].transaction_ref, "TXN2");
    }

    #[test]
    fn monthly_totals_zero_fill() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();

        let mut p = payment(ActorId::new(), None, PaymentKind::Premium, "TXN1");
        p.created_at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        db.insert_payment(&p).unwrap();

        let mut old = payment(ActorId::new(), None, PaymentKind::Premium, "TXN2");
        old.created_at = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        db.insert_payment(&old).unwrap();

        let months = db.monthly_totals(3, now).unwrap();
        assert_eq!(months.len(), 3);
        assert_eq!((months[0].year, months[0].month, months[0].total), (2024, 1, 0));
        assert_eq!((months[1].month, months[1].total, months[1].count), (2, 1000, 1));
        assert_eq!((months[2].month, months[2].total), (3, 0));
    }

    #[test]
    fn month_window_past_calendar_range() {
        let db = Database::open_in_memory().unwrap();
        let err = db.monthly_totals(u32::MAX, Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::Calendar(_)));
        assert!(!err.is_constraint());
    }
}
