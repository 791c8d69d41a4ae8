//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.  Mutations go through
//! [`Database::mutate`], which hands the caller a [`Tx`] bound to an
//! `IMMEDIATE` transaction: the write lock is taken up front, so checks made
//! inside the closure still hold when the writes land, and everything the
//! closure wrote is committed or rolled back as one unit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{Result, StoreError};
use crate::migrations;

/// Anything that can run statements against the schema: the [`Database`]
/// itself (autocommit reads) or an open [`Tx`].
///
/// The store traits ([`IssueStore`](crate::IssueStore),
/// [`AuditLog`](crate::AuditLog), ...) are implemented for every
/// `Connected` type.
pub trait Connected {
    fn connection(&self) -> &Connection;
}

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/civitas/civitas.db`
    /// - macOS:   `~/Library/Application Support/org.civitas.civitas/civitas.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\civitas\civitas\data\civitas.db`
    pub fn new() -> Result<Self> {
        let db_path = Self::default_path()?;
        tracing::info!(path = %db_path.display(), "opening database");
        Self::open_at(&db_path)
    }

    /// Resolve (and create the parent directory of) the default database path.
    pub fn default_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("org", "civitas", "civitas").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("civitas.db"))
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// Open a private in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// How long a writer waits for another connection's write lock before
    /// failing with `SQLITE_BUSY`.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// Run `f` inside one `IMMEDIATE` transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; any error (from the
    /// closure or from the commit itself) leaves the database untouched.
    pub fn mutate<R, E, F>(&mut self, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&Tx<'_>) -> std::result::Result<R, E>,
        E: From<StoreError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let tx = Tx { tx };

        let value = f(&tx)?;

        tx.tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}

impl Connected for Database {
    fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// An open write transaction. Dropping it without going through
/// [`Database::mutate`]'s commit rolls everything back.
pub struct Tx<'a> {
    tx: Transaction<'a>,
}

impl Connected for Tx<'_> {
    fn connection(&self) -> &Connection {
        &self.tx
    }
}
