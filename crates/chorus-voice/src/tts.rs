use crate::config::SynthesizerConfig;
use crate::error::VoiceError;
use crate::{build_http_client, require_api_key, Synthesizer};
use async_trait::async_trait;
use serde::Serialize;

const PROVIDER: &str = "text-to-speech";

/// Longest text, in characters, submitted for synthesis.
pub const SYNTHESIS_CHAR_LIMIT: usize = 128;

/// Cuts `text` down to its first [`SYNTHESIS_CHAR_LIMIT`] characters.
///
/// Counts Unicode scalar values so multi-byte text is never split inside a
/// character.
pub fn truncate_for_synthesis(text: &str) -> &str {
    match text.char_indices().nth(SYNTHESIS_CHAR_LIMIT) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// ElevenLabs text-to-speech client producing MP3 audio.
#[derive(Debug, Clone)]
pub struct ElevenLabsSynthesizer {
    config: SynthesizerConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: SynthesizerConfig) -> Result<Self, VoiceError> {
        let client = build_http_client(config.timeout_seconds)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Option<Vec<u8>>, VoiceError> {
        require_api_key(PROVIDER, &self.config.api_key)?;

        let text = truncate_for_synthesis(text);
        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            voice_id
        );
        let request = SpeechRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                voice_id,
                "speech synthesis declined"
            );
            return Ok(None);
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            tracing::warn!(voice_id, "speech synthesis returned no audio");
            return Ok(None);
        }
        Ok(Some(audio.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_for_synthesis("Hi there!"), "Hi there!");
        assert_eq!(truncate_for_synthesis(""), "");
    }

    #[test]
    fn long_text_is_cut_to_limit() {
        let text = "a".repeat(300);
        assert_eq!(truncate_for_synthesis(&text).len(), SYNTHESIS_CHAR_LIMIT);

        let exact = "b".repeat(SYNTHESIS_CHAR_LIMIT);
        assert_eq!(truncate_for_synthesis(&exact), exact);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(200);
        let cut = truncate_for_synthesis(&text);
        assert_eq!(cut.chars().count(), SYNTHESIS_CHAR_LIMIT);
        assert_eq!(cut.len(), SYNTHESIS_CHAR_LIMIT * 2);
    }
}
