//! Error types for the authentication protocols.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Client not registered: {0}")]
    NotRegistered(String),

    #[error("No active challenge for client: {0}")]
    NoActiveChallenge(String),

    #[error("Timestamp out of acceptable range: {timestamp} (server time {now})")]
    StaleTimestamp { timestamp: i64, now: i64 },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid server signature")]
    InvalidServerSignature,

    #[error("Client not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Core error: {0}")]
    Core(#[from] sigauth_core::Error),
}

impl AuthError {
    /// HTTP status this error is reported with: 400 for malformed requests,
    /// 401 for authentication refusals, 500 otherwise.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingField(_) | Self::InvalidPublicKey(_) => 400,
            Self::NotRegistered(_)
            | Self::NoActiveChallenge(_)
            | Self::StaleTimestamp { .. }
            | Self::InvalidSignature
            | Self::InvalidServerSignature
            | Self::Unauthenticated(_) => 401,
            Self::Core(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
