//! The SQLite-backed bot directory.

use chorus_db::{open_store, DbPool, DbRuntimeSettings};
use chorus_pipeline::{BotDirectory, SqliteBotDirectory};
use chorus_store::{create_bot, update_bot_voice};
use chorus_types::{BotKey, NewBot, VoiceAssignment};

fn open_temp_store() -> (tempfile::TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chorus.db");
    let pool = open_store(path.to_str().unwrap(), DbRuntimeSettings::default())
        .expect("store should open");
    (dir, pool)
}

#[tokio::test]
async fn loads_registered_bot_with_voice() {
    let (_dir, pool) = open_temp_store();
    {
        let mut conn = pool.get().unwrap();
        create_bot(
            &mut conn,
            &NewBot {
                owner_id: "owner".to_string(),
                server_id: "srv".to_string(),
                name: "Pepper Flakes".to_string(),
                character_description: Some("A blank slate.".to_string()),
                example_speech: None,
                voice_id: None,
                custom_voice: false,
                profile_picture_url: None,
            },
        )
        .unwrap();
        update_bot_voice(
            &mut conn,
            &BotKey::new("srv", "Pepper Flakes"),
            &VoiceAssignment {
                provider_voice_id: "voice-9".to_string(),
                custom: true,
            },
        )
        .unwrap();
    }

    let directory = SqliteBotDirectory::new(pool);
    let bot = directory
        .load_bot(&BotKey::new("srv", "Pepper Flakes"))
        .await
        .unwrap()
        .expect("bot should exist");
    assert_eq!(bot.resolved_voice_id(), "voice-9");
    assert_eq!(bot.persona().character_description, "A blank slate.");

    let missing = directory
        .load_bot(&BotKey::new("srv", "Nobody"))
        .await
        .unwrap();
    assert!(missing.is_none());
}
