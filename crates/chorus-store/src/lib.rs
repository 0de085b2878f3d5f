//! Configuration store for Chorus bots.
//!
//! Typed CRUD over the four configuration entities (users, bots, voices and
//! webhook bindings) plus the bot ↔ binding resolution and pruning logic.
//!
//! Every mutating function takes `&mut Connection` and runs inside a single
//! `IMMEDIATE` transaction: either all of its statements become visible or
//! none do. Read-only functions take `&Connection` and can be called on a
//! plain connection or inside a caller's transaction.
//!
//! Implicit creation of owners and voices during bot registration uses a
//! read-check-insert pattern. Two first-time registrations racing on the
//! same key are serialized by SQLite's write lock; the loser observes the
//! winner's row (or trips the unique index) and gets [`StoreError::Conflict`].

pub mod bots;
pub mod users;
pub mod voices;
pub mod webhooks;

pub use bots::{
    create_bot, delete_bot, delete_bots_by_owner, delete_bots_by_server, find_bot, get_bot,
    list_owner_bots, update_bot, update_bot_voice,
};
pub use users::{create_user, get_user, get_user_bot_count, set_user_tier};
pub use voices::get_voice;
pub use webhooks::{
    create_webhook, delete_webhook, get_webhook, link_bot_webhook, list_server_webhooks,
    prune_server_webhooks, prune_webhook, resolve_bots_by_channel, unlink_bot_webhook,
    update_webhook, webhook_reference_count,
};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use thiserror::Error;

/// Errors returned by configuration store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("not found: {0}")]
    NotFound(String),
    /// A uniqueness rule would be violated; the caller may retry with another key.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The exact row being created is already present.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid input: {0}")]
    Validation(String),
    /// No connection could be obtained or the blocking worker failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Opens the write transaction every mutating operation runs in.
///
/// `IMMEDIATE` takes the write lock up front so that concurrent writers wait
/// on the busy timeout instead of failing when upgrading a read lock.
pub(crate) fn write_tx(conn: &mut Connection) -> Result<Transaction<'_>, StoreError> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

/// Returns `true` for UNIQUE and PRIMARY KEY violations.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Returns `true` for FOREIGN KEY violations.
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
