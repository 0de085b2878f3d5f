//! Channel webhook bindings and their bot links.
//!
//! A binding is the single record used to post into a channel. Bots are
//! attached to bindings through the `bots_webhooks` join table; a binding
//! is only ever deleted once no bot references it.

use crate::bots::{map_row_to_bot, BOT_COLUMNS, BOT_FROM};
use crate::{is_foreign_key_violation, is_unique_violation, require, write_tx, StoreError};
use chorus_types::{
    BotWebhookLink, ChannelBot, NewWebhook, PruneResult, ServerPruneResult, WebhookBinding,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const WEBHOOK_COLUMNS: &str = "id, server_id, channel_id, webhook_id, webhook_url, created_at";

/// Records the webhook used to post into a channel.
///
/// # Errors
///
/// Returns `StoreError::Conflict` if the channel already has a binding.
pub fn create_webhook(conn: &mut Connection, new: &NewWebhook) -> Result<WebhookBinding, StoreError> {
    validate(new)?;

    let tx = write_tx(conn)?;
    let result = tx.execute(
        "INSERT INTO webhooks (server_id, channel_id, webhook_id, webhook_url)
         VALUES (?1, ?2, ?3, ?4)",
        params![new.server_id, new.channel_id, new.webhook_id, new.webhook_url],
    );
    match result {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(StoreError::Conflict(format!(
                "channel {} on server {} already has a webhook",
                new.channel_id, new.server_id
            )));
        }
        Err(e) => return Err(e.into()),
    }
    let binding = get_webhook(&tx, &new.server_id, &new.channel_id)?;
    tx.commit()?;

    tracing::info!(
        server_id = %new.server_id,
        channel_id = %new.channel_id,
        "created webhook binding"
    );
    Ok(binding)
}

pub fn get_webhook(
    conn: &Connection,
    server_id: &str,
    channel_id: &str,
) -> Result<WebhookBinding, StoreError> {
    conn.query_row(
        &format!("SELECT {WEBHOOK_COLUMNS} FROM webhooks WHERE server_id = ?1 AND channel_id = ?2"),
        params![server_id, channel_id],
        map_row_to_webhook,
    )
    .optional()?
    .ok_or_else(|| not_found(server_id, channel_id))
}

pub fn list_server_webhooks(
    conn: &Connection,
    server_id: &str,
) -> Result<Vec<WebhookBinding>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WEBHOOK_COLUMNS} FROM webhooks WHERE server_id = ?1 ORDER BY id"
    ))?;
    let bindings = stmt
        .query_map([server_id], map_row_to_webhook)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(bindings)
}

/// Re-points an existing binding at a new platform webhook.
///
/// Links survive because the binding keeps its row id.
pub fn update_webhook(conn: &mut Connection, new: &NewWebhook) -> Result<WebhookBinding, StoreError> {
    validate(new)?;

    let tx = write_tx(conn)?;
    let count = tx.execute(
        "UPDATE webhooks SET webhook_id = ?1, webhook_url = ?2
         WHERE server_id = ?3 AND channel_id = ?4",
        params![new.webhook_id, new.webhook_url, new.server_id, new.channel_id],
    )?;
    if count == 0 {
        return Err(not_found(&new.server_id, &new.channel_id));
    }
    let binding = get_webhook(&tx, &new.server_id, &new.channel_id)?;
    tx.commit()?;
    Ok(binding)
}

/// Deletes a binding outright.
///
/// Returns `false` if the channel had no binding.
///
/// # Errors
///
/// Returns `StoreError::Conflict` while any bot is still linked to it;
/// use [`prune_webhook`] for the lenient variant.
pub fn delete_webhook(
    conn: &mut Connection,
    server_id: &str,
    channel_id: &str,
) -> Result<bool, StoreError> {
    let tx = write_tx(conn)?;
    let binding = match get_webhook(&tx, server_id, channel_id) {
        Ok(binding) => binding,
        Err(StoreError::NotFound(_)) => return Ok(false),
        Err(e) => return Err(e),
    };

    let refs = webhook_reference_count(&tx, binding.id)?;
    if refs > 0 {
        return Err(StoreError::Conflict(format!(
            "webhook for channel {channel_id} is still used by {refs} bot(s)"
        )));
    }
    tx.execute("DELETE FROM webhooks WHERE id = ?1", [binding.id])?;
    tx.commit()?;
    Ok(true)
}

/// Number of bots linked to a binding.
pub fn webhook_reference_count(conn: &Connection, binding_id: i64) -> Result<u32, StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM bots_webhooks WHERE webhook_id = ?1",
        [binding_id],
        |row| row.get(0),
    )?)
}

/// Attaches a bot to a binding.
///
/// # Errors
///
/// Returns `StoreError::Conflict` if the link already exists and
/// `StoreError::NotFound` if either side does not exist.
pub fn link_bot_webhook(
    conn: &mut Connection,
    link: &BotWebhookLink,
) -> Result<BotWebhookLink, StoreError> {
    let tx = write_tx(conn)?;
    let result = tx.execute(
        "INSERT INTO bots_webhooks (bot_id, webhook_id) VALUES (?1, ?2)",
        params![link.bot_id, link.webhook_id],
    );
    match result {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(StoreError::Conflict(format!(
                "bot {} is already linked to webhook {}",
                link.bot_id, link.webhook_id
            )));
        }
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(StoreError::NotFound(format!(
                "bot {} or webhook {}",
                link.bot_id, link.webhook_id
            )));
        }
        Err(e) => return Err(e.into()),
    }
    tx.commit()?;
    Ok(*link)
}

/// Detaches a bot from a binding. Returns `false` if they were not linked.
pub fn unlink_bot_webhook(conn: &mut Connection, link: &BotWebhookLink) -> Result<bool, StoreError> {
    let tx = write_tx(conn)?;
    let count = tx.execute(
        "DELETE FROM bots_webhooks WHERE bot_id = ?1 AND webhook_id = ?2",
        params![link.bot_id, link.webhook_id],
    )?;
    tx.commit()?;
    Ok(count > 0)
}

/// Lists the bots reachable in a channel together with the webhook to post
/// as them.
pub fn resolve_bots_by_channel(
    conn: &Connection,
    server_id: &str,
    channel_id: &str,
) -> Result<Vec<ChannelBot>, StoreError> {
    let sql = format!(
        "SELECT w.webhook_id, w.webhook_url, {BOT_COLUMNS} {BOT_FROM}
         JOIN bots_webhooks bw ON bw.bot_id = b.id
         JOIN webhooks w ON w.id = bw.webhook_id
         WHERE w.server_id = ?1 AND w.channel_id = ?2
         ORDER BY b.id"
    );

    let mut stmt = conn.prepare(&sql)?;
    let bots = stmt
        .query_map(params![server_id, channel_id], |row| {
            Ok(ChannelBot {
                webhook_id: row.get(0)?,
                webhook_url: row.get(1)?,
                bot: map_row_to_bot(row, 2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(bots)
}

/// Deletes a channel's binding if no bot uses it any more.
///
/// Never fails because of references: a still-referenced or missing
/// binding is reported as not deleted.
pub fn prune_webhook(
    conn: &mut Connection,
    server_id: &str,
    channel_id: &str,
) -> Result<PruneResult, StoreError> {
    let tx = write_tx(conn)?;
    let binding = match get_webhook(&tx, server_id, channel_id) {
        Ok(binding) => binding,
        Err(StoreError::NotFound(_)) => return Ok(PruneResult::kept()),
        Err(e) => return Err(e),
    };

    if webhook_reference_count(&tx, binding.id)? > 0 {
        return Ok(PruneResult::kept());
    }

    tx.execute("DELETE FROM webhooks WHERE id = ?1", [binding.id])?;
    tx.commit()?;

    tracing::info!(server_id, channel_id, "pruned unused webhook binding");
    Ok(PruneResult {
        deleted: true,
        webhook_id: Some(binding.webhook_id),
    })
}

/// Deletes every unreferenced binding of a server, leaving the rest intact.
pub fn prune_server_webhooks(
    conn: &mut Connection,
    server_id: &str,
) -> Result<ServerPruneResult, StoreError> {
    let tx = write_tx(conn)?;
    let unused: Vec<(i64, String)> = {
        let mut stmt = tx.prepare(
            "SELECT w.id, w.webhook_id FROM webhooks w
             WHERE w.server_id = ?1
               AND NOT EXISTS (SELECT 1 FROM bots_webhooks bw WHERE bw.webhook_id = w.id)
             ORDER BY w.id",
        )?;
        let rows = stmt
            .query_map([server_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    for (id, _) in &unused {
        tx.execute("DELETE FROM webhooks WHERE id = ?1", [id])?;
    }
    tx.commit()?;

    if !unused.is_empty() {
        tracing::info!(server_id, count = unused.len(), "pruned unused server webhooks");
    }
    Ok(ServerPruneResult {
        deleted: !unused.is_empty(),
        webhook_ids: unused.into_iter().map(|(_, webhook_id)| webhook_id).collect(),
    })
}

fn validate(new: &NewWebhook) -> Result<(), StoreError> {
    require("server_id", &new.server_id)?;
    require("channel_id", &new.channel_id)?;
    require("webhook_id", &new.webhook_id)?;
    require("webhook_url", &new.webhook_url)
}

fn not_found(server_id: &str, channel_id: &str) -> StoreError {
    StoreError::NotFound(format!(
        "webhook for channel {channel_id} on server {server_id}"
    ))
}

fn map_row_to_webhook(row: &Row) -> rusqlite::Result<WebhookBinding> {
    Ok(WebhookBinding {
        id: row.get(0)?,
        server_id: row.get(1)?,
        channel_id: row.get(2)?,
        webhook_id: row.get(3)?,
        webhook_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bots::{create_bot, delete_bot, update_bot};
    use crate::test_support::setup_db;
    use chorus_types::{Bot, BotUpdate, NewBot};

    fn hook(server: &str, channel: &str, id: &str) -> NewWebhook {
        NewWebhook {
            server_id: server.to_string(),
            channel_id: channel.to_string(),
            webhook_id: id.to_string(),
            webhook_url: format!("https://hooks.example/{id}"),
        }
    }

    fn bot(conn: &mut Connection, server: &str, name: &str) -> Bot {
        create_bot(
            conn,
            &NewBot {
                owner_id: "owner".to_string(),
                server_id: server.to_string(),
                name: name.to_string(),
                character_description: None,
                example_speech: None,
                voice_id: None,
                custom_voice: false,
                profile_picture_url: None,
            },
        )
        .unwrap()
    }

    fn link(bot: &Bot, binding: &WebhookBinding) -> BotWebhookLink {
        BotWebhookLink {
            bot_id: bot.id,
            webhook_id: binding.id,
        }
    }

    #[test]
    fn webhook_crud() {
        let mut conn = setup_db();

        let created = create_webhook(&mut conn, &hook("srv", "chan", "wh-1")).unwrap();
        assert_eq!(created.webhook_url, "https://hooks.example/wh-1");
        assert_eq!(get_webhook(&conn, "srv", "chan").unwrap(), created);

        let updated = update_webhook(&mut conn, &hook("srv", "chan", "wh-2")).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.webhook_id, "wh-2");

        create_webhook(&mut conn, &hook("srv", "chan-2", "wh-3")).unwrap();
        create_webhook(&mut conn, &hook("other", "chan", "wh-4")).unwrap();
        assert_eq!(list_server_webhooks(&conn, "srv").unwrap().len(), 2);

        assert!(delete_webhook(&mut conn, "srv", "chan").unwrap());
        assert!(!delete_webhook(&mut conn, "srv", "chan").unwrap());
    }

    #[test]
    fn one_binding_per_channel() {
        let mut conn = setup_db();
        create_webhook(&mut conn, &hook("srv", "chan", "wh-1")).unwrap();
        let err = create_webhook(&mut conn, &hook("srv", "chan", "wh-2")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
    }

    #[test]
    fn update_missing_webhook_is_not_found() {
        let mut conn = setup_db();
        let err = update_webhook(&mut conn, &hook("srv", "nowhere", "wh")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn link_and_unlink() {
        let mut conn = setup_db();
        let pepper = bot(&mut conn, "srv", "Pepper");
        let binding = create_webhook(&mut conn, &hook("srv", "chan", "wh-1")).unwrap();

        link_bot_webhook(&mut conn, &link(&pepper, &binding)).unwrap();
        let err = link_bot_webhook(&mut conn, &link(&pepper, &binding)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
        assert_eq!(webhook_reference_count(&conn, binding.id).unwrap(), 1);

        assert!(unlink_bot_webhook(&mut conn, &link(&pepper, &binding)).unwrap());
        assert!(!unlink_bot_webhook(&mut conn, &link(&pepper, &binding)).unwrap());
    }

    #[test]
    fn link_to_missing_side_is_not_found() {
        let mut conn = setup_db();
        let pepper = bot(&mut conn, "srv", "Pepper");
        let err = link_bot_webhook(
            &mut conn,
            &BotWebhookLink {
                bot_id: pepper.id,
                webhook_id: 999,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
    }

    #[test]
    fn referenced_binding_cannot_be_deleted() {
        let mut conn = setup_db();
        let pepper = bot(&mut conn, "srv", "Pepper");
        let binding = create_webhook(&mut conn, &hook("srv", "chan", "wh-1")).unwrap();
        link_bot_webhook(&mut conn, &link(&pepper, &binding)).unwrap();

        let err = delete_webhook(&mut conn, "srv", "chan").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
        assert!(get_webhook(&conn, "srv", "chan").is_ok());
    }

    #[test]
    fn resolve_bots_in_channel() {
        let mut conn = setup_db();
        let pepper = bot(&mut conn, "srv", "Pepper");
        let salt = bot(&mut conn, "srv", "Salt");
        bot(&mut conn, "srv", "Unlinked");
        let chan = create_webhook(&mut conn, &hook("srv", "chan", "wh-1")).unwrap();
        let elsewhere = create_webhook(&mut conn, &hook("srv", "chan-2", "wh-2")).unwrap();

        link_bot_webhook(&mut conn, &link(&pepper, &chan)).unwrap();
        link_bot_webhook(&mut conn, &link(&salt, &chan)).unwrap();
        link_bot_webhook(&mut conn, &link(&salt, &elsewhere)).unwrap();

        let found = resolve_bots_by_channel(&conn, "srv", "chan").unwrap();
        let names: Vec<&str> = found.iter().map(|c| c.bot.name.as_str()).collect();
        assert_eq!(names, vec!["Pepper", "Salt"]);
        assert!(found.iter().all(|c| c.webhook_id == "wh-1"));
        assert_eq!(found[0].bot, pepper);

        assert!(resolve_bots_by_channel(&conn, "srv", "empty")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn renamed_bot_still_resolves() {
        let mut conn = setup_db();
        let pepper = bot(&mut conn, "srv", "Pepper");
        let chan = create_webhook(&mut conn, &hook("srv", "chan", "wh-1")).unwrap();
        link_bot_webhook(&mut conn, &link(&pepper, &chan)).unwrap();

        update_bot(
            &mut conn,
            &pepper.key(),
            &BotUpdate {
                name: Some("Paprika".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let found = resolve_bots_by_channel(&conn, "srv", "chan").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].bot.name, "Paprika");
    }

    #[test]
    fn prune_keeps_referenced_binding() {
        let mut conn = setup_db();
        let pepper = bot(&mut conn, "srv", "Pepper");
        let chan = create_webhook(&mut conn, &hook("srv", "chan", "wh-1")).unwrap();
        link_bot_webhook(&mut conn, &link(&pepper, &chan)).unwrap();

        assert_eq!(
            prune_webhook(&mut conn, "srv", "chan").unwrap(),
            PruneResult::kept()
        );

        delete_bot(&mut conn, &pepper.key()).unwrap();
        let pruned = prune_webhook(&mut conn, "srv", "chan").unwrap();
        assert!(pruned.deleted);
        assert_eq!(pruned.webhook_id.as_deref(), Some("wh-1"));

        assert_eq!(
            prune_webhook(&mut conn, "srv", "chan").unwrap(),
            PruneResult::kept()
        );
    }

    #[test]
    fn prune_server_only_removes_unused_bindings() {
        let mut conn = setup_db();
        let pepper = bot(&mut conn, "srv", "Pepper");
        let used = create_webhook(&mut conn, &hook("srv", "a", "wh-a")).unwrap();
        create_webhook(&mut conn, &hook("srv", "b", "wh-b")).unwrap();
        create_webhook(&mut conn, &hook("srv", "c", "wh-c")).unwrap();
        create_webhook(&mut conn, &hook("other", "d", "wh-d")).unwrap();
        link_bot_webhook(&mut conn, &link(&pepper, &used)).unwrap();

        let result = prune_server_webhooks(&mut conn, "srv").unwrap();
        assert!(result.deleted);
        assert_eq!(result.webhook_ids, vec!["wh-b".to_string(), "wh-c".to_string()]);

        let remaining = list_server_webhooks(&conn, "srv").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].channel_id, "a");
        assert_eq!(list_server_webhooks(&conn, "other").unwrap().len(), 1);

        let again = prune_server_webhooks(&mut conn, "srv").unwrap();
        assert!(!again.deleted);
        assert!(again.webhook_ids.is_empty());
    }
}
