//! Error types for the client.

use sigauth_handshake::AuthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Server public key not fetched")]
    MissingServerKey,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Core error: {0}")]
    Core(#[from] sigauth_core::Error),
}

impl ClientError {
    /// HTTP status of a server rejection, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
