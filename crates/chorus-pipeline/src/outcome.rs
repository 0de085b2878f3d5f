use chorus_store::StoreError;
use chorus_types::BotKey;
use chorus_voice::VoiceError;
use thiserror::Error;

/// What a completed turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    /// Exactly the text the responder returned.
    pub reply_text: String,
    /// Encoded speech for the reply.
    pub audio: Vec<u8>,
    pub transcript: String,
}

/// Result of running one turn.
///
/// Only [`TurnOutcome::Success`] carries audio. Later variants keep whatever
/// the earlier stages produced so callers can still show it.
#[derive(Debug)]
pub enum TurnOutcome {
    Success(TurnReply),
    /// The clip contained no recognizable speech.
    NoTranscription,
    TranscriptionError(VoiceError),
    UnknownBot(BotKey),
    /// The model answered with nothing.
    NoReply { transcript: String },
    GenerationError { transcript: String, error: VoiceError },
    /// The speech provider declined the reply.
    SynthesisFailed { transcript: String, reply_text: String },
    SynthesisError {
        transcript: String,
        reply_text: String,
        error: VoiceError,
    },
}

impl TurnOutcome {
    /// Stable machine-readable label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::NoTranscription => "no_transcription",
            Self::TranscriptionError(_) => "transcription_error",
            Self::UnknownBot(_) => "unknown_bot",
            Self::NoReply { .. } => "no_reply",
            Self::GenerationError { .. } => "generation_error",
            Self::SynthesisFailed { .. } => "synthesis_failed",
            Self::SynthesisError { .. } => "synthesis_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// `true` when a provider call failed outright, as opposed to answering
    /// with an empty result.
    pub fn is_adapter_error(&self) -> bool {
        matches!(
            self,
            Self::TranscriptionError(_) | Self::GenerationError { .. } | Self::SynthesisError { .. }
        )
    }

    pub fn transcript(&self) -> Option<&str> {
        match self {
            Self::Success(reply) => Some(&reply.transcript),
            Self::NoReply { transcript }
            | Self::GenerationError { transcript, .. }
            | Self::SynthesisFailed { transcript, .. }
            | Self::SynthesisError { transcript, .. } => Some(transcript),
            Self::NoTranscription | Self::TranscriptionError(_) | Self::UnknownBot(_) => None,
        }
    }

    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Self::Success(reply) => Some(&reply.reply_text),
            Self::SynthesisFailed { reply_text, .. } | Self::SynthesisError { reply_text, .. } => {
                Some(reply_text)
            }
            _ => None,
        }
    }

    /// The provider error behind a failed stage, if any.
    pub fn error(&self) -> Option<&VoiceError> {
        match self {
            Self::TranscriptionError(error)
            | Self::GenerationError { error, .. }
            | Self::SynthesisError { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// A turn that could not be attempted.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("invalid turn request: {0}")]
    Validation(String),

    #[error("failed to load bot configuration: {0}")]
    Storage(#[from] StoreError),
}

impl TurnError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Storage(_) => "storage_error",
        }
    }
}
