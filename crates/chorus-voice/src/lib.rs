//! Speech and language provider adapters for Chorus.
//!
//! Each provider sits behind a small async trait so the conversation
//! pipeline can be driven by real HTTP clients in production and by
//! in-process doubles in tests:
//!
//! - [`Transcriber`]: audio clip to text ([`GoogleTranscriber`])
//! - [`Responder`]: persona plus chat history to a reply ([`OpenAiResponder`])
//! - [`Synthesizer`]: reply text to encoded audio ([`ElevenLabsSynthesizer`])
//!
//! Every method distinguishes three results: `Ok(Some(_))` when the provider
//! produced something, `Ok(None)` when it answered but had nothing to give,
//! and `Err(_)` when the call itself failed.

pub mod config;
pub mod error;
pub mod responder;
pub mod stt;
pub mod tts;

pub use config::{ResponderConfig, SynthesizerConfig, TranscriberConfig};
pub use error::VoiceError;
pub use responder::{build_prompt, OpenAiResponder, PromptMessage};
pub use stt::GoogleTranscriber;
pub use tts::{truncate_for_synthesis, ElevenLabsSynthesizer, SYNTHESIS_CHAR_LIMIT};

use async_trait::async_trait;
use chorus_types::{ChatMessage, Persona};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum audio clip accepted for transcription (10 MiB).
pub const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

/// Sample encoding of a recorded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    /// Uncompressed signed 16-bit little-endian PCM.
    Linear16,
}

impl AudioEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear16 => "LINEAR16",
        }
    }
}

/// Format of the audio handed to a [`Transcriber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub channels: u16,
}

impl Default for AudioFormat {
    /// Voice-channel capture format: 48 kHz stereo PCM.
    fn default() -> Self {
        Self {
            encoding: AudioEncoding::Linear16,
            sample_rate_hertz: 48_000,
            channels: 2,
        }
    }
}

/// Converts recorded speech into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Returns the most likely transcript, or `None` if nothing was recognized.
    async fn transcribe(
        &self,
        audio: &[u8],
        format: &AudioFormat,
    ) -> Result<Option<String>, VoiceError>;
}

/// Produces an in-character reply to a conversation.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Returns the reply text, or `None` if the model produced nothing.
    async fn complete(
        &self,
        persona: &Persona,
        history: &[ChatMessage],
    ) -> Result<Option<String>, VoiceError>;
}

/// Renders reply text as speech.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Returns encoded audio, or `None` if the provider declined the request.
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Option<Vec<u8>>, VoiceError>;
}

pub(crate) fn build_http_client(timeout_seconds: u64) -> Result<reqwest::Client, VoiceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn require_api_key(provider: &str, api_key: &str) -> Result<(), VoiceError> {
    if api_key.is_empty() {
        return Err(VoiceError::Config(format!("{provider} API key is not configured")));
    }
    Ok(())
}
