//! # civitas-store
//!
//! SQLite persistence for the civic issue tracker.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection`. Reads run directly against it; writes go through
//! [`Database::mutate`], which runs a closure inside one `IMMEDIATE`
//! transaction. The typed store traits ([`ActorStore`], [`IssueStore`],
//! [`AuditLog`], [`PaymentLedger`]) are implemented for both, so the same
//! helper can be used inside or outside a transaction.

pub mod actors;
pub mod database;
pub mod issues;
pub mod migrations;
pub mod models;
pub mod payments;
pub mod timeline;

mod columns;
mod error;
mod query;

#[cfg(test)]
mod test_fixtures;

pub use actors::ActorStore;
pub use database::{Connected, Database, Tx};
pub use error::{Result, StoreError};
pub use issues::IssueStore;
pub use models::*;
pub use payments::PaymentLedger;
pub use timeline::AuditLog;
