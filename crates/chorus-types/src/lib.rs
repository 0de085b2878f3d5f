//! Shared types for the Chorus voice bot services.
//!
//! This crate holds the entity records persisted by the configuration
//! store (users, bots, voices, webhook bindings), the subscription tier
//! table, and the chat message shape exchanged with the language model.
//!
//! Every other crate in the workspace depends on `chorus-types` for these
//! definitions so that the store, the adapters and the HTTP layer agree on
//! field names without depending on one another.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod bot;
mod voice;
mod webhook;

pub use bot::{Bot, BotKey, BotUpdate, NewBot, Persona, User, UserBotCount};
pub use voice::{Voice, VoiceAssignment, DEFAULT_VOICE_ID};
pub use webhook::{
    BotWebhookLink, ChannelBot, NewWebhook, PruneResult, ServerPruneResult, WebhookBinding,
};

/// Subscription level of a bot owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Default level for owners without a subscription.
    #[default]
    Free,
    Basic,
    Premium,
    /// Internal accounts; no quota applies.
    Dev,
}

/// Limits attached to a [`Tier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    /// Maximum number of bots the owner may register, `None` for unlimited.
    pub bot_quota: Option<u32>,
    /// Whether the owner's bots may speak in voice channels.
    pub voice_enabled: bool,
    /// Whether the owner may assign cloned (custom) voices.
    pub custom_voice: bool,
}

impl Tier {
    /// Returns the string stored in the `users.tier` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Dev => "dev",
        }
    }

    pub fn limits(self) -> TierLimits {
        match self {
            Self::Free => TierLimits {
                bot_quota: Some(1),
                voice_enabled: false,
                custom_voice: false,
            },
            Self::Basic => TierLimits {
                bot_quota: Some(3),
                voice_enabled: true,
                custom_voice: false,
            },
            Self::Premium => TierLimits {
                bot_quota: Some(5),
                voice_enabled: true,
                custom_voice: true,
            },
            Self::Dev => TierLimits {
                bot_quota: None,
                voice_enabled: true,
                custom_voice: true,
            },
        }
    }

    /// Returns `true` if an owner already holding `bot_count` bots may
    /// register another one.
    pub fn allows_another_bot(self, bot_count: u32) -> bool {
        match self.limits().bot_quota {
            Some(quota) => bot_count < quota,
            None => true,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tier label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            "dev" => Ok(Self::Dev),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

/// Role of a chat message as understood by the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry of a running conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of whoever said it.
    #[serde(rename = "name")]
    pub speaker: String,
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_parses_stored_labels() {
        for tier in [Tier::Free, Tier::Basic, Tier::Premium, Tier::Dev] {
            assert_eq!(tier.as_str().parse::<Tier>(), Ok(tier));
        }
        assert_eq!(
            "gold".parse::<Tier>(),
            Err(UnknownTier("gold".to_string()))
        );
    }

    #[test]
    fn tier_quota() {
        assert!(Tier::Free.allows_another_bot(0));
        assert!(!Tier::Free.allows_another_bot(1));
        assert!(Tier::Basic.allows_another_bot(2));
        assert!(!Tier::Basic.allows_another_bot(3));
        assert!(!Tier::Premium.allows_another_bot(5));
        assert!(Tier::Dev.allows_another_bot(10_000));
    }

    #[test]
    fn free_tier_has_no_voice() {
        assert!(!Tier::Free.limits().voice_enabled);
        assert!(Tier::Basic.limits().voice_enabled);
        assert!(!Tier::Basic.limits().custom_voice);
        assert!(Tier::Premium.limits().custom_voice);
    }

    #[test]
    fn chat_message_uses_name_field_on_the_wire() {
        let msg = ChatMessage::user("alice", "hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["name"], "alice");
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
    }
}
