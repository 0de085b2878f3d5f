//! Bot registration and persona configuration.

use crate::users::{ensure_user, internal_user_id};
use crate::voices::{ensure_voice, prune_orphan_voices};
use crate::{is_unique_violation, require, write_tx, StoreError};
use chorus_types::{Bot, BotKey, BotUpdate, NewBot, Voice, VoiceAssignment};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Column list shared by every query returning a [`Bot`].
pub(crate) const BOT_COLUMNS: &str = "b.id, u.user_id, b.server_id, b.name,
        b.character_description, b.example_speech, b.profile_picture_url, b.created_at,
        v.id, v.provider_voice_id, v.custom, v.created_at";

/// Owners are joined to expose the platform user id; the voice join is
/// optional because bots without a voice use the default one.
pub(crate) const BOT_FROM: &str = "FROM bots b
     JOIN users u ON u.id = b.owner_id
     LEFT JOIN voices v ON v.id = b.voice_id";

/// Registers a bot, creating its owner and voice on first use.
///
/// # Errors
///
/// Returns `StoreError::Conflict` if the server already has a bot with the
/// same name, and `StoreError::Validation` for empty key fields.
pub fn create_bot(conn: &mut Connection, new: &NewBot) -> Result<Bot, StoreError> {
    require("owner_id", &new.owner_id)?;
    require("server_id", &new.server_id)?;
    require("name", &new.name)?;

    let key = BotKey::new(new.server_id.clone(), new.name.clone());
    let tx = write_tx(conn)?;

    if find_bot(&tx, &key)?.is_some() {
        return Err(conflict(&key));
    }

    let owner = ensure_user(&tx, &new.owner_id)?;
    let voice = match &new.voice_id {
        Some(provider_voice_id) => Some(ensure_voice(
            &tx,
            &VoiceAssignment {
                provider_voice_id: provider_voice_id.clone(),
                custom: new.custom_voice,
            },
        )?),
        None => None,
    };

    let result = tx.execute(
        "INSERT INTO bots (owner_id, server_id, name, character_description, example_speech,
                           voice_id, profile_picture_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            owner,
            new.server_id,
            new.name,
            new.character_description,
            new.example_speech,
            voice,
            new.profile_picture_url,
        ],
    );
    match result {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Err(conflict(&key)),
        Err(e) => return Err(e.into()),
    }

    let bot = get_bot(&tx, &key)?;
    tx.commit()?;

    tracing::info!(
        server_id = %bot.server_id,
        name = %bot.name,
        owner_id = %bot.owner_id,
        "registered bot"
    );
    Ok(bot)
}

/// Looks up a bot by server and name.
pub fn get_bot(conn: &Connection, key: &BotKey) -> Result<Bot, StoreError> {
    find_bot(conn, key)?.ok_or_else(|| not_found(key))
}

/// Like [`get_bot`], but a missing bot is `Ok(None)`.
pub fn find_bot(conn: &Connection, key: &BotKey) -> Result<Option<Bot>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {BOT_COLUMNS} {BOT_FROM} WHERE b.server_id = ?1 AND b.name = ?2"),
            params![key.server_id, key.name],
            |row| map_row_to_bot(row, 0),
        )
        .optional()?)
}

/// Lists an owner's bots on one server, oldest first.
pub fn list_owner_bots(
    conn: &Connection,
    owner_id: &str,
    server_id: &str,
) -> Result<Vec<Bot>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOT_COLUMNS} {BOT_FROM} WHERE u.user_id = ?1 AND b.server_id = ?2 ORDER BY b.id"
    ))?;
    let bots = stmt
        .query_map(params![owner_id, server_id], |row| map_row_to_bot(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(bots)
}

/// Applies a partial update to a bot's persona fields.
///
/// A rename keeps the bot's identity and links; it fails with
/// `StoreError::Conflict` if the new name is taken on the same server.
pub fn update_bot(
    conn: &mut Connection,
    key: &BotKey,
    update: &BotUpdate,
) -> Result<Bot, StoreError> {
    if let Some(name) = &update.name {
        require("name", name)?;
    }

    let tx = write_tx(conn)?;

    let mut set_parts: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut idx = 1usize;

    if let Some(name) = &update.name {
        set_parts.push(format!("name = ?{}", idx));
        values.push(Box::new(name.clone()));
        idx += 1;
    }
    if let Some(description) = &update.character_description {
        set_parts.push(format!("character_description = ?{}", idx));
        values.push(Box::new(description.clone()));
        idx += 1;
    }
    if let Some(speech) = &update.example_speech {
        set_parts.push(format!("example_speech = ?{}", idx));
        values.push(Box::new(speech.clone()));
        idx += 1;
    }
    if let Some(url) = &update.profile_picture_url {
        set_parts.push(format!("profile_picture_url = ?{}", idx));
        values.push(Box::new(url.clone()));
        idx += 1;
    }

    if set_parts.is_empty() {
        return get_bot(&tx, key);
    }

    let sql = format!(
        "UPDATE bots SET {} WHERE server_id = ?{} AND name = ?{}",
        set_parts.join(", "),
        idx,
        idx + 1
    );
    values.push(Box::new(key.server_id.clone()));
    values.push(Box::new(key.name.clone()));

    let params: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let count = match tx.execute(&sql, params.as_slice()) {
        Ok(count) => count,
        Err(e) if is_unique_violation(&e) => {
            let taken = BotKey::new(
                key.server_id.clone(),
                update.name.clone().unwrap_or_default(),
            );
            return Err(conflict(&taken));
        }
        Err(e) => return Err(e.into()),
    };
    if count == 0 {
        return Err(not_found(key));
    }

    let current = BotKey::new(
        key.server_id.clone(),
        update.name.clone().unwrap_or_else(|| key.name.clone()),
    );
    let bot = get_bot(&tx, &current)?;
    tx.commit()?;
    Ok(bot)
}

/// Points a bot at another voice.
///
/// The voice row is created if needed; the previously assigned voice is
/// removed when this was its last bot.
pub fn update_bot_voice(
    conn: &mut Connection,
    key: &BotKey,
    voice: &VoiceAssignment,
) -> Result<Bot, StoreError> {
    require("provider_voice_id", &voice.provider_voice_id)?;

    let tx = write_tx(conn)?;
    if find_bot(&tx, key)?.is_none() {
        return Err(not_found(key));
    }

    let voice_row = ensure_voice(&tx, voice)?;
    tx.execute(
        "UPDATE bots SET voice_id = ?1 WHERE server_id = ?2 AND name = ?3",
        params![voice_row, key.server_id, key.name],
    )?;
    prune_orphan_voices(&tx)?;

    let bot = get_bot(&tx, key)?;
    tx.commit()?;

    tracing::info!(
        server_id = %key.server_id,
        name = %key.name,
        voice = %voice.provider_voice_id,
        "assigned bot voice"
    );
    Ok(bot)
}

/// Deletes one bot and its channel links.
///
/// Returns `false` if no such bot existed.
pub fn delete_bot(conn: &mut Connection, key: &BotKey) -> Result<bool, StoreError> {
    let tx = write_tx(conn)?;
    let count = tx.execute(
        "DELETE FROM bots WHERE server_id = ?1 AND name = ?2",
        params![key.server_id, key.name],
    )?;
    if count > 0 {
        prune_orphan_voices(&tx)?;
    }
    tx.commit()?;
    Ok(count > 0)
}

/// Deletes an owner's bots, on one server or everywhere.
///
/// Purging without a server also removes the owner record. Returns the
/// deleted bots; an unknown owner yields an empty list.
pub fn delete_bots_by_owner(
    conn: &mut Connection,
    owner_id: &str,
    server_id: Option<&str>,
) -> Result<Vec<Bot>, StoreError> {
    let tx = write_tx(conn)?;
    let Some(owner) = internal_user_id(&tx, owner_id)? else {
        return Ok(Vec::new());
    };

    let deleted = match server_id {
        Some(server_id) => {
            let bots = select_bots(
                &tx,
                &format!("SELECT {BOT_COLUMNS} {BOT_FROM} WHERE b.owner_id = ?1 AND b.server_id = ?2 ORDER BY b.id"),
                params![owner, server_id],
            )?;
            tx.execute(
                "DELETE FROM bots WHERE owner_id = ?1 AND server_id = ?2",
                params![owner, server_id],
            )?;
            bots
        }
        None => {
            let bots = select_bots(
                &tx,
                &format!("SELECT {BOT_COLUMNS} {BOT_FROM} WHERE b.owner_id = ?1 ORDER BY b.id"),
                params![owner],
            )?;
            tx.execute("DELETE FROM bots WHERE owner_id = ?1", params![owner])?;
            tx.execute("DELETE FROM users WHERE id = ?1", params![owner])?;
            bots
        }
    };

    prune_orphan_voices(&tx)?;
    tx.commit()?;

    tracing::info!(
        owner_id,
        server_id = server_id.unwrap_or("*"),
        count = deleted.len(),
        "deleted owner bots"
    );
    Ok(deleted)
}

/// Deletes every bot on a server, e.g. when the bot is removed from it.
pub fn delete_bots_by_server(conn: &mut Connection, server_id: &str) -> Result<Vec<Bot>, StoreError> {
    let tx = write_tx(conn)?;
    let bots = select_bots(
        &tx,
        &format!("SELECT {BOT_COLUMNS} {BOT_FROM} WHERE b.server_id = ?1 ORDER BY b.id"),
        params![server_id],
    )?;
    tx.execute("DELETE FROM bots WHERE server_id = ?1", params![server_id])?;
    prune_orphan_voices(&tx)?;
    tx.commit()?;

    tracing::info!(server_id, count = bots.len(), "deleted server bots");
    Ok(bots)
}

fn select_bots(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Bot>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let bots = stmt
        .query_map(params, |row| map_row_to_bot(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(bots)
}

/// Maps the [`BOT_COLUMNS`] columns starting at `offset`.
pub(crate) fn map_row_to_bot(row: &Row, offset: usize) -> rusqlite::Result<Bot> {
    let voice_id: Option<i64> = row.get(offset + 8)?;
    let voice = match voice_id {
        Some(id) => Some(Voice {
            id,
            provider_voice_id: row.get(offset + 9)?,
            custom: row.get(offset + 10)?,
            created_at: row.get(offset + 11)?,
        }),
        None => None,
    };

    Ok(Bot {
        id: row.get(offset)?,
        owner_id: row.get(offset + 1)?,
        server_id: row.get(offset + 2)?,
        name: row.get(offset + 3)?,
        character_description: row.get(offset + 4)?,
        example_speech: row.get(offset + 5)?,
        profile_picture_url: row.get(offset + 6)?,
        created_at: row.get(offset + 7)?,
        voice,
    })
}

fn conflict(key: &BotKey) -> StoreError {
    StoreError::Conflict(format!(
        "bot '{}' already exists on server {}",
        key.name, key.server_id
    ))
}

fn not_found(key: &BotKey) -> StoreError {
    StoreError::NotFound(format!("bot '{}' on server {}", key.name, key.server_id))
}
