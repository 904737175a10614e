//! Completion client seam used by the analyst stages.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a language-model call.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The API key environment variable is not set.
    #[error("{0} environment variable not set")]
    MissingApiKey(&'static str),

    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// The response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A client setting is out of range.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// No HTTP client was compiled in.
    #[error("completion clients are disabled in this build")]
    Disabled,
}

/// Sends one prompt to a language model and returns its text answer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the provider/model label used in logs.
    fn describe(&self) -> String;

    /// Completes `prompt`. An empty string means the model produced no text.
    async fn complete(&self, prompt: &str) -> Result<String, ClientError>;
}
