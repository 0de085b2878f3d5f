//! Bot owners and their subscription tiers.

use crate::{is_unique_violation, require, write_tx, StoreError};
use chorus_types::{Tier, User, UserBotCount};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, user_id, tier, created_at";

/// Registers a bot owner.
///
/// # Errors
///
/// Returns `StoreError::AlreadyExists` if the platform user id is already
/// registered.
pub fn create_user(
    conn: &mut Connection,
    user_id: &str,
    tier: Option<Tier>,
) -> Result<User, StoreError> {
    require("user_id", user_id)?;

    let tx = write_tx(conn)?;
    let result = tx.execute(
        "INSERT INTO users (user_id, tier) VALUES (?1, ?2)",
        params![user_id, tier.map(Tier::as_str)],
    );
    match result {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(StoreError::AlreadyExists(format!("user {user_id}")));
        }
        Err(e) => return Err(e.into()),
    }
    let user = get_user(&tx, user_id)?;
    tx.commit()?;

    tracing::info!(user_id, tier = ?tier, "registered bot owner");
    Ok(user)
}

/// Looks up an owner by platform user id.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<User, StoreError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
        [user_id],
        map_row_to_user,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
}

/// Replaces an owner's tier.
pub fn set_user_tier(conn: &mut Connection, user_id: &str, tier: Tier) -> Result<User, StoreError> {
    let tx = write_tx(conn)?;
    let count = tx.execute(
        "UPDATE users SET tier = ?1 WHERE user_id = ?2",
        params![tier.as_str(), user_id],
    )?;
    if count == 0 {
        return Err(StoreError::NotFound(format!("user {user_id}")));
    }
    let user = get_user(&tx, user_id)?;
    tx.commit()?;
    Ok(user)
}

/// Counts the bots owned by a user across all servers.
pub fn get_user_bot_count(conn: &Connection, user_id: &str) -> Result<UserBotCount, StoreError> {
    conn.query_row(
        "SELECT u.user_id, COUNT(b.id)
         FROM users u LEFT JOIN bots b ON b.owner_id = u.id
         WHERE u.user_id = ?1
         GROUP BY u.id",
        [user_id],
        |row| {
            Ok(UserBotCount {
                user_id: row.get(0)?,
                bot_count: row.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
}

/// Returns the internal row id of an owner, creating the owner if needed.
pub(crate) fn ensure_user(conn: &Connection, user_id: &str) -> Result<i64, StoreError> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE user_id = ?1", [user_id], |row| {
            row.get(0)
        })
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute("INSERT INTO users (user_id) VALUES (?1)", [user_id])?;
    tracing::debug!(user_id, "created owner during bot registration");
    Ok(conn.last_insert_rowid())
}

pub(crate) fn internal_user_id(conn: &Connection, user_id: &str) -> Result<Option<i64>, StoreError> {
    Ok(conn
        .query_row("SELECT id FROM users WHERE user_id = ?1", [user_id], |row| {
            row.get(0)
        })
        .optional()?)
}

fn map_row_to_user(row: &Row) -> rusqlite::Result<User> {
    let tier: Option<String> = row.get(2)?;
    let tier = tier
        .map(|label| {
            label.parse::<Tier>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()?;

    Ok(User {
        id: row.get(0)?,
        user_id: row.get(1)?,
        tier,
        created_at: row.get(3)?,
    })
}
