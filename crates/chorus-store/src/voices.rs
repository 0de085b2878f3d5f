//! Provider voices shared between bots.
//!
//! Voices are created implicitly when a bot is pointed at an unknown
//! provider voice id and removed once the last referencing bot lets go.

use crate::StoreError;
use chorus_types::{Voice, VoiceAssignment};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub fn get_voice(conn: &Connection, provider_voice_id: &str) -> Result<Voice, StoreError> {
    conn.query_row(
        "SELECT id, provider_voice_id, custom, created_at FROM voices WHERE provider_voice_id = ?1",
        [provider_voice_id],
        map_row_to_voice,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("voice {provider_voice_id}")))
}

/// Returns the row id for a provider voice, inserting it if absent.
///
/// An existing voice keeps its original `custom` flag.
pub(crate) fn ensure_voice(conn: &Connection, voice: &VoiceAssignment) -> Result<i64, StoreError> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM voices WHERE provider_voice_id = ?1",
            [&voice.provider_voice_id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO voices (provider_voice_id, custom) VALUES (?1, ?2)",
        params![voice.provider_voice_id, voice.custom],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Deletes every voice no bot references any more.
///
/// Returns the provider ids of the removed voices.
pub(crate) fn prune_orphan_voices(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT provider_voice_id FROM voices v
         WHERE NOT EXISTS (SELECT 1 FROM bots b WHERE b.voice_id = v.id)",
    )?;
    let orphans = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    if !orphans.is_empty() {
        conn.execute(
            "DELETE FROM voices
             WHERE NOT EXISTS (SELECT 1 FROM bots b WHERE b.voice_id = voices.id)",
            [],
        )?;
        tracing::debug!(count = orphans.len(), "removed unreferenced voices");
    }
    Ok(orphans)
}

pub(crate) fn map_row_to_voice(row: &Row) -> rusqlite::Result<Voice> {
    Ok(Voice {
        id: row.get(0)?,
        provider_voice_id: row.get(1)?,
        custom: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_db;

    fn assignment(id: &str, custom: bool) -> VoiceAssignment {
        VoiceAssignment {
            provider_voice_id: id.to_string(),
            custom,
        }
    }

    #[test]
    fn ensure_voice_reuses_existing_row() {
        let conn = setup_db();
        let first = ensure_voice(&conn, &assignment("v-1", true)).unwrap();
        let second = ensure_voice(&conn, &assignment("v-1", false)).unwrap();
        assert_eq!(first, second);

        let voice = get_voice(&conn, "v-1").unwrap();
        assert!(voice.custom, "existing flag is preserved");
    }

    #[test]
    fn unreferenced_voices_are_pruned() {
        let conn = setup_db();
        ensure_voice(&conn, &assignment("lonely", false)).unwrap();
        let used = ensure_voice(&conn, &assignment("used", false)).unwrap();
        conn.execute("INSERT INTO users (user_id) VALUES ('o')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO bots (owner_id, server_id, name, voice_id) VALUES (1, 's', 'b', ?1)",
            [used],
        )
        .unwrap();

        let removed = prune_orphan_voices(&conn).unwrap();
        assert_eq!(removed, vec!["lonely".to_string()]);
        assert!(matches!(
            get_voice(&conn, "lonely"),
            Err(StoreError::NotFound(_))
        ));
        assert!(get_voice(&conn, "used").is_ok());
    }
}
