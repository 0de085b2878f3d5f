use serde::{Deserialize, Serialize};
use std::fmt;

fn default_timeout_seconds() -> u64 {
    30
}

fn default_speech_endpoint() -> String {
    "https://speech.googleapis.com/v1/speech:recognize".to_string()
}

fn default_language_code() -> String {
    "en-US".to_string()
}

fn default_chat_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    150
}

fn default_tts_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_tts_model() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_voice_setting() -> f32 {
    0.5
}

/// Speech-to-text provider settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_speech_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_speech_endpoint(),
            language_code: default_language_code(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl fmt::Debug for TranscriberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriberConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("language_code", &self.language_code)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Chat completion provider settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on reply length, in tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_chat_endpoint(),
            model: default_chat_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl fmt::Debug for ResponderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponderConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Text-to-speech provider settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_tts_base_url")]
    pub base_url: String,
    #[serde(default = "default_tts_model")]
    pub model_id: String,
    #[serde(default = "default_voice_setting")]
    pub stability: f32,
    #[serde(default = "default_voice_setting")]
    pub similarity_boost: f32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_tts_base_url(),
            model_id: default_tts_model(),
            stability: default_voice_setting(),
            similarity_boost: default_voice_setting(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl fmt::Debug for SynthesizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesizerConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .field("stability", &self.stability)
            .field("similarity_boost", &self.similarity_boost)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "[UNSET]"
    } else {
        "[REDACTED]"
    }
}
