use crate::config::TranscriberConfig;
use crate::error::VoiceError;
use crate::{build_http_client, require_api_key, AudioFormat, Transcriber, MAX_AUDIO_BYTES};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "speech-to-text";

/// Google Cloud Speech-to-Text client using the synchronous `recognize` call.
#[derive(Debug, Clone)]
pub struct GoogleTranscriber {
    config: TranscriberConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'a str,
    audio_channel_count: u16,
}

#[derive(Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Deserialize, Default)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<RecognitionAlternative>,
}

#[derive(Deserialize)]
struct RecognitionAlternative {
    #[serde(default)]
    transcript: String,
}

impl GoogleTranscriber {
    pub fn new(config: TranscriberConfig) -> Result<Self, VoiceError> {
        let client = build_http_client(config.timeout_seconds)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Transcriber for GoogleTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        format: &AudioFormat,
    ) -> Result<Option<String>, VoiceError> {
        if audio.len() > MAX_AUDIO_BYTES {
            return Err(VoiceError::InputTooLarge {
                size: audio.len(),
                limit: MAX_AUDIO_BYTES,
            });
        }
        require_api_key(PROVIDER, &self.config.api_key)?;

        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: format.encoding.as_str(),
                sample_rate_hertz: format.sample_rate_hertz,
                language_code: &self.config.language_code,
                audio_channel_count: format.channels,
            },
            audio: RecognitionAudio {
                content: BASE64.encode(audio),
            },
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "transcription request rejected");
            return Err(VoiceError::Provider {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: RecognizeResponse = if body.trim().is_empty() {
            RecognizeResponse::default()
        } else {
            serde_json::from_str(&body).map_err(|e| VoiceError::Decode(e.to_string()))?
        };

        let transcript = parsed
            .results
            .into_iter()
            .next()
            .and_then(|result| result.alternatives.into_iter().next())
            .map(|alt| alt.transcript)
            .filter(|text| !text.is_empty());

        if transcript.is_none() {
            tracing::debug!(bytes = audio.len(), "no speech recognized");
        }
        Ok(transcript)
    }
}
