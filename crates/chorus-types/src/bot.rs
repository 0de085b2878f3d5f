//! Bot and owner records.

use crate::voice::{Voice, DEFAULT_VOICE_ID};
use crate::Tier;
use serde::{Deserialize, Serialize};

/// A bot owner, identified by the chat platform's user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal database ID.
    pub id: i64,
    /// Opaque user id from the chat platform.
    pub user_id: String,
    /// Subscription level, if one was ever recorded.
    pub tier: Option<Tier>,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

impl User {
    /// Tier used for entitlement checks; owners without one count as free.
    pub fn effective_tier(&self) -> Tier {
        self.tier.unwrap_or_default()
    }
}

/// Number of bots owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBotCount {
    pub user_id: String,
    pub bot_count: u32,
}

/// Addressing key of a bot: names are unique within a server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BotKey {
    pub server_id: String,
    pub name: String,
}

impl BotKey {
    pub fn new(server_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            name: name.into(),
        }
    }
}

/// A configured chat bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bot {
    /// Internal database ID.
    pub id: i64,
    /// Platform user id of the owner.
    pub owner_id: String,
    pub server_id: String,
    pub name: String,
    pub character_description: Option<String>,
    /// Few-shot sample of how the character talks.
    pub example_speech: Option<String>,
    /// Assigned voice; `None` means the default voice is used.
    pub voice: Option<Voice>,
    pub profile_picture_url: Option<String>,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

impl Bot {
    pub fn key(&self) -> BotKey {
        BotKey::new(self.server_id.clone(), self.name.clone())
    }

    /// Character fields used to build the language model system prompt.
    pub fn persona(&self) -> Persona {
        Persona {
            name: self.name.clone(),
            character_description: self.character_description.clone().unwrap_or_default(),
            example_speech: self.example_speech.clone().unwrap_or_default(),
        }
    }

    /// Provider voice id to synthesize with, falling back to the default voice.
    pub fn resolved_voice_id(&self) -> &str {
        self.voice
            .as_ref()
            .map(|v| v.provider_voice_id.as_str())
            .unwrap_or(DEFAULT_VOICE_ID)
    }
}

/// Character-defining fields of a bot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub character_description: String,
    pub example_speech: String,
}

/// Parameters for registering a new bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBot {
    pub owner_id: String,
    pub server_id: String,
    pub name: String,
    #[serde(default)]
    pub character_description: Option<String>,
    #[serde(default)]
    pub example_speech: Option<String>,
    /// Provider voice id to assign; created in the voice table if unknown.
    #[serde(default)]
    pub voice_id: Option<String>,
    /// Whether `voice_id` refers to a cloned voice.
    #[serde(default)]
    pub custom_voice: bool,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

/// Parameters for updating an existing bot.
///
/// Only fields that are `Some` are modified.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BotUpdate {
    pub name: Option<String>,
    pub character_description: Option<String>,
    pub example_speech: Option<String>,
    pub profile_picture_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(voice: Option<Voice>) -> Bot {
        Bot {
            id: 1,
            owner_id: "owner-1".to_string(),
            server_id: "srv-1".to_string(),
            name: "Pepper".to_string(),
            character_description: Some("A blank slate.".to_string()),
            example_speech: None,
            voice,
            profile_picture_url: None,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn resolved_voice_falls_back_to_default() {
        assert_eq!(bot(None).resolved_voice_id(), DEFAULT_VOICE_ID);

        let voice = Voice {
            id: 3,
            provider_voice_id: "custom-123".to_string(),
            custom: true,
            created_at: String::new(),
        };
        assert_eq!(bot(Some(voice)).resolved_voice_id(), "custom-123");
    }

    #[test]
    fn persona_fills_missing_fields_with_empty_strings() {
        let persona = bot(None).persona();
        assert_eq!(persona.name, "Pepper");
        assert_eq!(persona.character_description, "A blank slate.");
        assert_eq!(persona.example_speech, "");
    }

    #[test]
    fn user_without_tier_is_free() {
        let user = User {
            id: 1,
            user_id: "u".to_string(),
            tier: None,
            created_at: String::new(),
        };
        assert_eq!(user.effective_tier(), Tier::Free);
    }
}
