use thiserror::Error;

use crate::api_client::ApiError;
use crate::store::StoreError;

/// Agent-level error type for user-initiated operations (account, pairing,
/// mood and image updates). Background jobs never surface this; they map
/// every failure to a retryable outcome instead.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend response did not include tokens")]
    MissingTokens,

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Short, user-facing message in the spirit of a transient toast.
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Api(ApiError::MissingCredential) => {
                "Not logged in".to_string()
            }
            AgentError::Validation(msg) => msg.clone(),
            AgentError::MissingTokens => "Login failed: no tokens received".to_string(),
            AgentError::Api(ApiError::Http(_)) => "Connection error".to_string(),
            AgentError::Api(ApiError::Status { message, .. }) => format!("Request failed: {message}"),
            AgentError::Api(_) => "Data error".to_string(),
            AgentError::Store(_) | AgentError::Io(_) => "Local storage error".to_string(),
            AgentError::Image(msg) => format!("Image error: {msg}"),
        }
    }
}
