//! Synthesis voice identities.
//!
//! A `Voice` is shared by reference between any number of bots and is
//! removed only once no bot points at it.

use serde::{Deserialize, Serialize};

/// Provider voice used when a bot has no voice assigned.
pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

/// A stock or cloned provider voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Internal database ID.
    pub id: i64,
    /// Voice identifier at the synthesis provider.
    pub provider_voice_id: String,
    /// `true` for cloned voices, `false` for stock provider voices.
    pub custom: bool,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// Request to point a bot at a (possibly new) voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceAssignment {
    pub provider_voice_id: String,
    #[serde(default)]
    pub custom: bool,
}
