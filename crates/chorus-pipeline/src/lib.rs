//! Voice conversation turns.
//!
//! A turn takes one recorded utterance addressed to a bot and walks it
//! through five strictly sequential stages:
//!
//! 1. validate the request
//! 2. transcribe the audio
//! 3. append the transcript to the recent history
//! 4. load the bot's persona and generate a reply
//! 5. synthesize the reply with the bot's voice
//!
//! Each stage can end the turn early. Empty provider answers and provider
//! failures are reported as distinct [`TurnOutcome`] variants; only invalid
//! requests and storage failures are errors. Nothing is retried within a
//! turn.

mod directory;
mod outcome;

pub use directory::{BotDirectory, SqliteBotDirectory};
pub use outcome::{TurnError, TurnOutcome, TurnReply};

use chorus_types::{BotKey, ChatMessage};
use chorus_voice::{
    truncate_for_synthesis, AudioFormat, Responder, Synthesizer, Transcriber, MAX_AUDIO_BYTES,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

fn default_max_history() -> usize {
    7
}

fn default_min_audio_bytes() -> usize {
    1
}

/// Tunables for [`TurnPipeline`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of most recent messages, including the new transcript, sent to
    /// the responder.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Shortest clip worth transcribing, in bytes.
    #[serde(default = "default_min_audio_bytes")]
    pub min_audio_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            min_audio_bytes: default_min_audio_bytes(),
        }
    }
}

/// One utterance to answer.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub audio: Vec<u8>,
    pub format: AudioFormat,
    /// Display name of the person who spoke.
    pub speaker_name: String,
    /// Earlier messages, oldest first.
    pub history: Vec<ChatMessage>,
    /// Bot being addressed.
    pub bot: BotKey,
}

/// Runs turns against a fixed set of adapters.
#[derive(Clone)]
pub struct TurnPipeline {
    transcriber: Arc<dyn Transcriber>,
    responder: Arc<dyn Responder>,
    synthesizer: Arc<dyn Synthesizer>,
    directory: Arc<dyn BotDirectory>,
    config: PipelineConfig,
}

impl TurnPipeline {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        responder: Arc<dyn Responder>,
        synthesizer: Arc<dyn Synthesizer>,
        directory: Arc<dyn BotDirectory>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            transcriber,
            responder,
            synthesizer,
            directory,
            config,
        }
    }

    /// Runs a single turn to completion.
    ///
    /// # Errors
    ///
    /// Returns `TurnError::Validation` before any provider is called if the
    /// request is malformed, and `TurnError::Storage` if the bot
    /// configuration cannot be read.
    pub async fn run(&self, request: TurnRequest) -> Result<TurnOutcome, TurnError> {
        let started = Instant::now();
        let bot_key = request.bot.clone();

        let outcome = self.run_stages(request).await?;

        tracing::info!(
            server_id = %bot_key.server_id,
            bot = %bot_key.name,
            outcome = outcome.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "turn finished"
        );
        Ok(outcome)
    }

    async fn run_stages(&self, request: TurnRequest) -> Result<TurnOutcome, TurnError> {
        self.validate(&request)?;

        let TurnRequest {
            audio,
            format,
            speaker_name,
            mut history,
            bot: bot_key,
        } = request;

        let transcript = match self.transcriber.transcribe(&audio, &format).await {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => return Ok(TurnOutcome::NoTranscription),
            Err(error) => {
                tracing::warn!(error = %error, "transcription failed");
                return Ok(TurnOutcome::TranscriptionError(error));
            }
        };
        tracing::debug!(chars = transcript.chars().count(), "transcribed utterance");

        history.push(ChatMessage::user(speaker_name, transcript.clone()));
        let window = self.config.max_history.max(1);
        if history.len() > window {
            history.drain(..history.len() - window);
        }

        let Some(bot) = self.directory.load_bot(&bot_key).await.map_err(|e| {
            tracing::error!(error = %e, "failed to load bot configuration");
            TurnError::Storage(e)
        })?
        else {
            tracing::debug!(server_id = %bot_key.server_id, bot = %bot_key.name, "unknown bot");
            return Ok(TurnOutcome::UnknownBot(bot_key));
        };

        let reply_text = match self.responder.complete(&bot.persona(), &history).await {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => return Ok(TurnOutcome::NoReply { transcript }),
            Err(error) => {
                tracing::warn!(error = %error, "reply generation failed");
                return Ok(TurnOutcome::GenerationError { transcript, error });
            }
        };
        tracing::debug!(chars = reply_text.chars().count(), "generated reply");

        let synthesized = self
            .synthesizer
            .synthesize(truncate_for_synthesis(&reply_text), bot.resolved_voice_id())
            .await;
        match synthesized {
            Ok(Some(audio)) if !audio.is_empty() => Ok(TurnOutcome::Success(TurnReply {
                reply_text,
                audio,
                transcript,
            })),
            Ok(_) => Ok(TurnOutcome::SynthesisFailed {
                transcript,
                reply_text,
            }),
            Err(error) => {
                tracing::warn!(error = %error, "speech synthesis failed");
                Ok(TurnOutcome::SynthesisError {
                    transcript,
                    reply_text,
                    error,
                })
            }
        }
    }

    fn validate(&self, request: &TurnRequest) -> Result<(), TurnError> {
        if request.speaker_name.trim().is_empty() {
            return Err(TurnError::Validation("speaker name must not be empty".into()));
        }
        if request.bot.server_id.trim().is_empty() || request.bot.name.trim().is_empty() {
            return Err(TurnError::Validation(
                "bot server id and name must not be empty".into(),
            ));
        }
        if request.audio.len() < self.config.min_audio_bytes.max(1) {
            return Err(TurnError::Validation(format!(
                "audio clip too short: {} bytes (minimum: {})",
                request.audio.len(),
                self.config.min_audio_bytes.max(1)
            )));
        }
        if request.audio.len() > MAX_AUDIO_BYTES {
            return Err(TurnError::Validation(format!(
                "audio clip too large: {} bytes (maximum: {})",
                request.audio.len(),
                MAX_AUDIO_BYTES
            )));
        }
        Ok(())
    }
}
