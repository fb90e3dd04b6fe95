//! Error types for the provider and bridge seams.
//!
//! Neither error ever reaches the person who pasted the log: provider errors
//! collapse into "no generated text", bridge errors into "try again next poll".

use thiserror::Error;

/// Failure of a single generation provider attempt.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("failed to parse provider response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("empty response")]
    EmptyResponse,
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure while talking to the shared request/response document.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bridge not configured: {0}")]
    NotConfigured(&'static str),

    #[error("document request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("document endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("document is not a valid request envelope: {0}")]
    Parse(#[from] serde_json::Error),
}
