//! Database layer for the Chorus configuration store.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization
//! and embedded SQL migrations. Every table the store touches (`users`,
//! `voices`, `bots`, `webhooks`, `bots_webhooks`) is created through the
//! versioned migrations in this crate.
//!
//! SQLite in WAL mode allows concurrent readers with a single writer, which
//! matches the access pattern of the bot services: many turn requests read
//! bot personas while configuration writes are rare.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, open_store, DbPool, DbRuntimeSettings, PoolError};
