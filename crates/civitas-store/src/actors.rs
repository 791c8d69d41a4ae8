//! CRUD operations for [`Account`] records.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use civitas_shared::{ActorId, Role};

use crate::columns::{encode_time, flag_at, parsed_at, time_at};
use crate::database::Connected;
use crate::error::{Result, StoreError};
use crate::models::Account;

const ACCOUNT_COLUMNS: &str =
    "id, name, email, photo, phone, role, is_premium, is_blocked, created_at, updated_at";

/// Actor profiles as seen by the engine.
pub trait ActorStore: Connected {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new account. A duplicate email surfaces as
    /// [`StoreError::Constraint`].
    fn insert_account(&self, account: &Account) -> Result<()> {
        self.connection().execute(
            "INSERT INTO accounts (id, name, email, photo, phone, role, is_premium, is_blocked, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                account.id.to_string(),
                account.name,
                account.email,
                account.photo,
                account.phone,
                account.role.as_str(),
                account.is_premium as i32,
                account.is_blocked as i32,
                encode_time(&account.created_at),
                encode_time(&account.updated_at),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    fn get_account(&self, id: ActorId) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
        Ok(self
            .connection()
            .query_row(&sql, params![id.to_string()], row_to_account)
            .optional()?)
    }

    fn require_account(&self, id: ActorId) -> Result<Account> {
        self.get_account(id)?.ok_or(StoreError::NotFound)
    }

    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1");
        Ok(self
            .connection()
            .query_row(&sql, params![email.trim()], row_to_account)
            .optional()?)
    }

    /// Accounts with the given role, newest first.
    fn list_accounts(&self, role: Role, limit: Option<u32>) -> Result<Vec<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE role = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2"
        );
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(i64::from).unwrap_or(-1);

        let mut stmt = self.connection().prepare(&sql)?;
        let rows = stmt.query_map(params![role.as_str(), limit], row_to_account)?;

        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?);
        }
        Ok(accounts)
    }

    /// Issues `id` has ever reported. Deleting an issue does not lower it.
    fn issues_reported(&self, id: ActorId) -> Result<u64> {
        let n: Option<i64> = self
            .connection()
            .query_row(
                "SELECT issues_reported FROM accounts WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        n.map(|n| n as u64).ok_or(StoreError::NotFound)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Flip `is_premium` on, conditioned on it currently being off.
    /// Returns `false` when the account is missing or already premium.
    fn set_premium(&self, id: ActorId, at: DateTime<Utc>) -> Result<bool> {
        let affected = self.connection().execute(
            "UPDATE accounts SET is_premium = 1, updated_at = ?2
             WHERE id = ?1 AND is_premium = 0",
            params![id.to_string(), encode_time(&at)],
        )?;
        Ok(affected > 0)
    }

    fn record_issue_reported(&self, id: ActorId) -> Result<bool> {
        let affected = self.connection().execute(
            "UPDATE accounts SET issues_reported = issues_reported + 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    fn set_blocked(&self, id: ActorId, blocked: bool, at: DateTime<Utc>) -> Result<bool> {
        let affected = self.connection().execute(
            "UPDATE accounts SET is_blocked = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.to_string(), blocked as i32, encode_time(&at)],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete an account.  Returns `true` if a row was deleted.  Accounts
    /// still referenced by an issue are refused by the foreign keys.
    fn delete_account(&self, id: ActorId) -> Result<bool> {
        let affected = self
            .connection()
            .execute("DELETE FROM accounts WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

impl<T: Connected + ?Sized> ActorStore for T {}

/// Map a `rusqlite::Row` to an [`Account`].
fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: parsed_at(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        photo: row.get(3)?,
        phone: row.get(4)?,
        role: parsed_at(row, 5)?,
        is_premium: flag_at(row, 6)?,
        is_blocked: flag_at(row, 7)?,
        created_at: time_at(row, 8)?,
        updated_at: time_at(row, 9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn account(email: &str, role: Role) -> Account {
        let now = Utc::now();
        Account {
            id: ActorId::new(),
            name: "Test".into(),
            email: email.into(),
            photo: None,
            phone: None,
            role,
            is_premium: false,
            is_blocked: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_and_fetch() {
        let db = Database::open_in_memory().unwrap();
        let acc = account("a@example.org", Role::Citizen);
        db.insert_account(&acc).unwrap();

        let fetched = db.get_account(acc.id).unwrap().unwrap();
        assert_eq!(fetched.email, "a@example.org");
        assert_eq!(fetched.role, Role::Citizen);

        let by_email = db.find_account_by_email("A@Example.org").unwrap().unwrap();
        assert_eq!(by_email.id, acc.id);
    }

    #[test]
    fn duplicate_email_is_constraint() {
        let db = Database::open_in_memory().unwrap();
        db.insert_account(&account("dup@example.org", Role::Citizen))
            .unwrap();
        let err = db
            .insert_account(&account("DUP@example.org", Role::Staff))
            .unwrap_err();
        assert!(err.is_constraint());
    }

    #[test]
    fn set_premium_only_once() {
        let db = Database::open_in_memory().unwrap();
        let acc = account("p@example.org", Role::Citizen);
        db.insert_account(&acc).unwrap();

        assert!(db.set_premium(acc.id, Utc::now()).unwrap());
        assert!(!db.set_premium(acc.id, Utc::now()).unwrap());
        assert!(db.get_account(acc.id).unwrap().unwrap().is_premium);
    }

    #[test]
    fn list_by_role() {
        let db = Database::open_in_memory().unwrap();
        db.insert_account(&account("s1@example.org", Role::Staff))
            .unwrap();
        db.insert_account(&account("s2@example.org", Role::Staff))
            .unwrap();
        db.insert_account(&account("c@example.org", Role::Citizen))
            .unwrap();

        assert_eq!(db.list_accounts(Role::Staff, None).unwrap().len(), 2);
        assert_eq!(db.list_accounts(Role::Staff, Some(1)).unwrap().len(), 1);
        assert!(db.list_accounts(Role::Admin, None).unwrap().is_empty());
    }

    #[test]
    fn reported_counter_only_grows() {
        let db = Database::open_in_memory().unwrap();
        let acc = account("r@example.org", Role::Citizen);
        db.insert_account(&acc).unwrap();
        assert_eq!(db.issues_reported(acc.id).unwrap(), 0);

        assert!(db.record_issue_reported(acc.id).unwrap());
        assert!(db.record_issue_reported(acc.id).unwrap());
        assert_eq!(db.issues_reported(acc.id).unwrap(), 2);

        assert!(!db.record_issue_reported(ActorId::new()).unwrap());
        assert!(matches!(
            db.issues_reported(ActorId::new()),
            Err(StoreError::NotFound)
        ));
    }
}
