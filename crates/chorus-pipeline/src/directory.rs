//! Persona lookup for the pipeline.

use async_trait::async_trait;
use chorus_db::DbPool;
use chorus_store::{find_bot, StoreError};
use chorus_types::{Bot, BotKey};

/// Source of bot configuration for a turn.
#[async_trait]
pub trait BotDirectory: Send + Sync {
    /// Returns the bot registered under `key`, or `None` if there is none.
    async fn load_bot(&self, key: &BotKey) -> Result<Option<Bot>, StoreError>;
}

/// [`BotDirectory`] backed by the SQLite configuration store.
#[derive(Clone)]
pub struct SqliteBotDirectory {
    pool: DbPool,
}

impl SqliteBotDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BotDirectory for SqliteBotDirectory {
    async fn load_bot(&self, key: &BotKey) -> Result<Option<Bot>, StoreError> {
        let pool = self.pool.clone();
        let key = key.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            find_bot(&conn, &key)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("bot lookup task failed: {e}")))?
    }
}
