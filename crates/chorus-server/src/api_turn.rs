//! The voice conversation turn endpoint.

use crate::api::ApiError;
use crate::AppState;
use axum::{
    extract::Multipart,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use base64::Engine;
use chorus_pipeline::{TurnError, TurnOutcome, TurnRequest};
use chorus_types::{BotKey, ChatMessage};
use chorus_voice::AudioFormat;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The `metadata` part of a turn upload.
#[derive(Debug, Deserialize)]
pub struct TurnMetadata {
    pub server_id: String,
    pub bot_name: String,
    pub speaker_name: String,
    /// Earlier messages, oldest first.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub sample_rate_hertz: Option<u32>,
    #[serde(default)]
    pub channels: Option<u16>,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_text: Option<String>,
    /// MP3 audio of the reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TurnResponse {
    fn status(outcome: &TurnOutcome) -> StatusCode {
        if outcome.is_success() {
            StatusCode::OK
        } else if outcome.is_adapter_error() {
            StatusCode::BAD_GATEWAY
        } else if matches!(outcome, TurnOutcome::UnknownBot(_)) {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::OK
        }
    }
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        let code = outcome.code();
        let error = outcome.error().map(ToString::to_string);
        match outcome {
            TurnOutcome::Success(reply) => Self {
                outcome: code,
                transcript: Some(reply.transcript),
                reply_text: Some(reply.reply_text),
                audio_base64: Some(base64::engine::general_purpose::STANDARD.encode(reply.audio)),
                error,
            },
            TurnOutcome::UnknownBot(key) => Self {
                outcome: code,
                transcript: None,
                reply_text: None,
                audio_base64: None,
                error: Some(format!("bot {} not found in server {}", key.name, key.server_id)),
            },
            other => Self {
                outcome: code,
                transcript: other.transcript().map(str::to_owned),
                reply_text: other.reply_text().map(str::to_owned),
                audio_base64: None,
                error,
            },
        }
    }
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::Validation(msg) => ApiError::BadRequest(msg),
            TurnError::Storage(e) => e.into(),
        }
    }
}

/// Handler for `POST /turn`.
///
/// Expects a multipart upload with an `audio` field (LINEAR16 PCM) and a
/// `metadata` field holding [`TurnMetadata`] as JSON.
pub async fn turn_handler(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut audio = None;
    let mut metadata = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart error: {}", e)))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("audio") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read audio: {}", e)))?;
                audio = Some(data.to_vec());
            }
            Some("metadata") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read metadata: {}", e)))?;
                let parsed: TurnMetadata = serde_json::from_str(&text)
                    .map_err(|e| ApiError::BadRequest(format!("invalid metadata: {}", e)))?;
                metadata = Some(parsed);
            }
            _ => {}
        }
    }

    let audio = audio.ok_or_else(|| ApiError::BadRequest("no audio provided".to_string()))?;
    let metadata =
        metadata.ok_or_else(|| ApiError::BadRequest("no metadata provided".to_string()))?;

    let mut format = AudioFormat::default();
    if let Some(rate) = metadata.sample_rate_hertz {
        format.sample_rate_hertz = rate;
    }
    if let Some(channels) = metadata.channels {
        format.channels = channels;
    }

    let request = TurnRequest {
        audio,
        format,
        speaker_name: metadata.speaker_name,
        history: metadata.history,
        bot: BotKey::new(metadata.server_id, metadata.bot_name),
    };

    let outcome = state.pipeline.run(request).await?;
    let status = TurnResponse::status(&outcome);
    Ok((status, Json(TurnResponse::from(outcome))).into_response())
}
