use thiserror::Error;

/// Failures talking to a speech or language provider.
///
/// An empty provider answer is not an error; adapters report it as
/// `Ok(None)`.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{provider} returned status {status}: {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("input too large: {size} bytes (limit: {limit} bytes)")]
    InputTooLarge { size: usize, limit: usize },

    #[error("invalid configuration: {0}")]
    Config(String),
}
