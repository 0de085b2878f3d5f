//! Webhook routing records.

use crate::bot::Bot;
use serde::{Deserialize, Serialize};

/// Routing record for posting bot output into one chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookBinding {
    /// Internal database ID.
    pub id: i64,
    pub server_id: String,
    pub channel_id: String,
    /// Webhook id at the chat platform.
    pub webhook_id: String,
    pub webhook_url: String,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// Parameters for creating or re-pointing a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWebhook {
    pub server_id: String,
    pub channel_id: String,
    pub webhook_id: String,
    pub webhook_url: String,
}

/// A row of the bot ↔ binding join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotWebhookLink {
    pub bot_id: i64,
    /// Internal ID of the [`WebhookBinding`].
    pub webhook_id: i64,
}

/// A bot reachable in a channel, with the binding used to post as it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBot {
    #[serde(flatten)]
    pub bot: Bot,
    pub webhook_id: String,
    pub webhook_url: String,
}

/// Outcome of pruning a single binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneResult {
    pub deleted: bool,
    /// Platform webhook id of the deleted binding, so the caller can remove
    /// the webhook on the chat platform too.
    pub webhook_id: Option<String>,
}

impl PruneResult {
    pub fn kept() -> Self {
        Self {
            deleted: false,
            webhook_id: None,
        }
    }
}

/// Outcome of pruning every binding of a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPruneResult {
    pub deleted: bool,
    /// Platform webhook ids actually deleted.
    pub webhook_ids: Vec<String>,
}
