// src/scoring/error.rs
use thiserror::Error;

pub const MISSING_API_KEY: &str = "API key not set. Please configure in extension settings.";

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("{}", MISSING_API_KEY)]
    MissingApiKey,

    /// The settings store could not be read, so the key state is unknown.
    #[error("{0}")]
    Settings(String),

    /// Non-2xx status; `body` is the server's error body, verbatim.
    #[error("API Error: {status} - {body}")]
    Status { status: u16, body: String },

    /// 2xx status but no text where the response contract puts it.
    #[error("API Error: {status} - {body}")]
    MalformedResponse { status: u16, body: String },

    /// An `error` event inside a streamed response.
    #[error("API Error: stream error - {0}")]
    Stream(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
