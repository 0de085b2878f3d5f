//! Store behavior under concurrent writers sharing one database file.

use chorus_db::{open_store, DbPool, DbRuntimeSettings};
use chorus_store::{create_bot, get_user_bot_count, StoreError};
use chorus_types::NewBot;
use std::sync::{Arc, Barrier};
use std::thread;

fn open_temp_store() -> (tempfile::TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chorus.db");
    let pool = open_store(
        path.to_str().expect("utf-8 path"),
        DbRuntimeSettings::default(),
    )
    .expect("store should open");
    (dir, pool)
}

fn new_bot(owner: &str, name: &str) -> NewBot {
    NewBot {
        owner_id: owner.to_string(),
        server_id: "srv".to_string(),
        name: name.to_string(),
        character_description: None,
        example_speech: None,
        voice_id: Some("shared-voice".to_string()),
        custom_voice: false,
        profile_picture_url: None,
    }
}

#[test]
fn racing_registrations_of_one_name_yield_one_winner() {
    let (_dir, pool) = open_temp_store();
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["u-1", "u-2"]
        .into_iter()
        .map(|owner| {
            let pool = pool.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut conn = pool.get().expect("connection");
                barrier.wait();
                create_bot(&mut conn, &new_bot(owner, "Pepper"))
            })
        })
        .collect();

    let results: Vec<Result<_, StoreError>> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(StoreError::Conflict(_))))
        .count();
    assert_eq!(winners, 1, "results: {results:?}");
    assert_eq!(conflicts, 1, "results: {results:?}");

    let conn = pool.get().unwrap();
    let bots: i64 = conn
        .query_row("SELECT COUNT(*) FROM bots", [], |row| row.get(0))
        .unwrap();
    assert_eq!(bots, 1);
}

#[test]
fn first_registrations_sharing_an_owner_create_it_once() {
    let (_dir, pool) = open_temp_store();
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pool = pool.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut conn = pool.get().expect("connection");
                barrier.wait();
                create_bot(&mut conn, &new_bot("owner", &format!("bot-{i}")))
            })
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .expect("thread panicked")
            .expect("distinct names must all register");
    }

    let conn = pool.get().unwrap();
    assert_eq!(get_user_bot_count(&conn, "owner").unwrap().bot_count, 4);
    let voices: i64 = conn
        .query_row("SELECT COUNT(*) FROM voices", [], |row| row.get(0))
        .unwrap();
    assert_eq!(voices, 1);
}
