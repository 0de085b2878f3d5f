//! Direct access to the speech and language providers.

use crate::api::{with_conn, ApiError};
use crate::AppState;
use axum::{
    extract::Multipart,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chorus_types::{BotKey, ChatMessage, Persona, DEFAULT_VOICE_ID};
use chorus_voice::{truncate_for_synthesis, AudioFormat, MAX_AUDIO_BYTES};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    /// `None` when no speech was recognized.
    pub transcription: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    #[serde(default, alias = "eleven_voice_id")]
    pub voice_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub messages: Vec<ChatMessage>,
    /// Speak as this stored bot.
    #[serde(default)]
    pub bot: Option<BotKey>,
    /// Speak as an ad-hoc character. Ignored when `bot` is set.
    #[serde(default)]
    pub persona: Option<Persona>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub reply: Option<String>,
}

/// Character used when a generate request names none.
fn default_persona() -> Persona {
    Persona {
        name: "Pepper Flakes".to_string(),
        character_description:
            "A blank slate waiting to come to life. Has no memories and wants an identity."
                .to_string(),
        example_speech: "I don't know what riding a ferris wheel is like because I've never \
                         been to an amusement park before."
            .to_string(),
    }
}

/// Handler for `POST /transcribe-audio`.
///
/// Expects a multipart upload with a `file` field holding 48 kHz stereo
/// LINEAR16 audio.
pub async fn transcribe_handler(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let mut audio = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read file: {}", e)))?;
            audio = Some(data);
            break;
        }
    }
    let audio = audio.ok_or_else(|| ApiError::BadRequest("no file provided".to_string()))?;

    if audio.len() > MAX_AUDIO_BYTES {
        return Err(ApiError::BadRequest(format!(
            "audio too large: {} bytes (max {})",
            audio.len(),
            MAX_AUDIO_BYTES
        )));
    }

    let transcription = state
        .transcriber
        .transcribe(&audio, &AudioFormat::default())
        .await?;
    if transcription.is_none() {
        tracing::warn!(bytes = audio.len(), "no speech recognized");
    }
    Ok(Json(TranscriptionResponse { transcription }))
}

/// Handler for `POST /text-to-speech`.
///
/// Returns `audio/mpeg`, or 204 if the provider declined the text.
pub async fn text_to_speech_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<SpeechRequest>,
) -> Result<Response, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }
    let voice_id = req.voice_id.as_deref().unwrap_or(DEFAULT_VOICE_ID);

    let audio = state
        .synthesizer
        .synthesize(truncate_for_synthesis(&req.text), voice_id)
        .await?;

    match audio {
        Some(audio) => Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response()),
        None => {
            tracing::warn!(voice_id, "speech provider returned no audio");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

/// Handler for `POST /generate`.
pub async fn generate_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let persona = match req.bot {
        Some(key) => {
            let bot = with_conn(&state, move |conn| Ok(chorus_store::get_bot(conn, &key)?)).await?;
            bot.persona()
        }
        None => req.persona.unwrap_or_else(default_persona),
    };

    let reply = state.responder.complete(&persona, &req.messages).await?;
    if reply.is_none() {
        tracing::warn!(character = %persona.name, "model produced no reply");
    }
    Ok(Json(GenerateResponse { reply }))
}
