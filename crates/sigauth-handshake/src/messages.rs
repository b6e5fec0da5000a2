//! Protocol message types and the canonical strings that get signed.
//!
//! Request fields are optional at the type level so that a missing field
//! reaches the protocol layer as [`AuthError::MissingField`] instead of a
//! deserialization failure.

use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use sigauth_core::Nonce;

/// `status` value of every successful response.
pub const STATUS_SUCCESS: &str = "success";

/// Route paths.
pub mod paths {
    pub const SERVER_PUBLIC_KEY: &str = "/get_server_public_key";
    pub const REGISTER: &str = "/register";
    pub const AUTH_TIMESTAMP: &str = "/auth/timestamp";
    pub const AUTH_CHALLENGE: &str = "/auth/challenge";
    pub const AUTH_CHALLENGE_VERIFY: &str = "/auth/challenge/verify";
    pub const AUTH_MUTUAL: &str = "/auth/mutual";
    pub const AUTH_MUTUAL_VERIFY: &str = "/auth/mutual/verify";
    pub const MESSAGE: &str = "/message";
    pub const HEALTH: &str = "/health";
}

/// `message` of a successful registration.
pub const MSG_REGISTERED: &str = "Client registered";
/// `message` of a successful one-way authentication.
pub const MSG_AUTHENTICATED: &str = "Authentication successful";
/// `message` of a successful mutual authentication.
pub const MSG_MUTUALLY_AUTHENTICATED: &str = "Mutual authentication successful";

// === Signed payloads ===

/// Message signed in the timestamp protocol: `client_id:timestamp`.
pub fn timestamp_message(client_id: &str, timestamp: i64) -> String {
    format!("{}:{}", client_id, timestamp)
}

/// Message signed in the one-way challenge protocol: the nonce in decimal.
pub fn challenge_message(nonce: Nonce) -> String {
    nonce.to_string()
}

/// Message signed by both sides in the mutual protocol:
/// `client_id:client_nonce:server_nonce`.
pub fn mutual_message(client_id: &str, client_nonce: Nonce, server_nonce: Nonce) -> String {
    format!("{}:{}:{}", client_id, client_nonce, server_nonce)
}

/// Require a non-empty string field.
pub fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AuthError::MissingField(field.to_string())),
    }
}

fn required_value<T: Copy>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| AuthError::MissingField(field.to_string()))
}

// === Requests ===

/// `POST /register`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl RegisterRequest {
    pub fn new(client_id: impl Into<String>, public_key_pem: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            public_key: Some(public_key_pem.into()),
        }
    }
}

/// `POST /auth/timestamp`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimestampAuthRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl TimestampAuthRequest {
    pub fn new(client_id: impl Into<String>, timestamp: i64, signature: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            timestamp: Some(timestamp),
            signature: Some(signature.into()),
        }
    }

    /// `(client_id, timestamp, signature)`, or the first missing field.
    pub fn fields(&self) -> Result<(&str, i64, &str)> {
        Ok((
            required(&self.client_id, "client_id")?,
            required_value(self.timestamp, "timestamp")?,
            required(&self.signature, "signature")?,
        ))
    }
}

/// `POST /auth/challenge`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChallengeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl ChallengeRequest {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
        }
    }
}

/// `POST /auth/challenge/verify` and `POST /auth/mutual/verify`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl VerifyRequest {
    pub fn new(client_id: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            signature: Some(signature.into()),
        }
    }

    /// `(client_id, signature)`, or the first missing field.
    pub fn fields(&self) -> Result<(&str, &str)> {
        Ok((
            required(&self.client_id, "client_id")?,
            required(&self.signature, "signature")?,
        ))
    }
}

/// `POST /auth/mutual`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutualInitRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_nonce: Option<Nonce>,
}

impl MutualInitRequest {
    pub fn new(client_id: impl Into<String>, client_nonce: Nonce) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_nonce: Some(client_nonce),
        }
    }

    /// `(client_id, client_nonce)`, or the first missing field.
    pub fn fields(&self) -> Result<(&str, Nonce)> {
        Ok((
            required(&self.client_id, "client_id")?,
            required_value(self.client_nonce, "client_nonce")?,
        ))
    }
}

/// `POST /message`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MessageRequest {
    pub fn new(client_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            message: Some(message.into()),
        }
    }
}

// === Responses ===

/// `GET /get_server_public_key`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    pub public_key: String,
}

/// Generic success response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: message.into(),
        }
    }
}

/// Response to `POST /auth/challenge`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub status: String,
    pub nonce: Nonce,
}

impl ChallengeResponse {
    pub fn new(nonce: Nonce) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            nonce,
        }
    }
}

/// Response to `POST /auth/mutual`: the server's nonce and its signature over
/// [`mutual_message`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutualInitResponse {
    pub status: String,
    pub server_nonce: Nonce,
    pub signature: String,
}

/// Response to `POST /message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub status: String,
    pub original_message: String,
    pub reversed_message: String,
}

/// Error body for every 4xx/5xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signed_payloads() {
        assert_eq!(timestamp_message("alice", 1700000000), "alice:1700000000");
        assert_eq!(challenge_message(482913), "482913");
        assert_eq!(mutual_message("alice", 123456, 654321), "alice:123456:654321");
    }

    #[test]
    fn test_missing_fields_deserialize() {
        let req: RegisterRequest = serde_json::from_value(json!({"client_id": "alice"})).unwrap();
        assert_eq!(req.client_id.as_deref(), Some("alice"));
        assert!(req.public_key.is_none());
    }

    #[test]
    fn test_empty_string_is_missing() {
        let req = VerifyRequest::new("alice", "");
        assert!(matches!(
            req.fields(),
            Err(AuthError::MissingField(f)) if f == "signature"
        ));
    }

    #[test]
    fn test_first_missing_field_reported() {
        let req = TimestampAuthRequest::default();
        assert!(matches!(
            req.fields(),
            Err(AuthError::MissingField(f)) if f == "client_id"
        ));

        let req = TimestampAuthRequest {
            client_id: Some("alice".into()),
            timestamp: None,
            signature: Some("sig".into()),
        };
        assert!(matches!(
            req.fields(),
            Err(AuthError::MissingField(f)) if f == "timestamp"
        ));
    }

    #[test]
    fn test_wire_names() {
        let req = MutualInitRequest::new("alice", 42);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"client_id": "alice", "client_nonce": 42})
        );

        let resp: MutualInitResponse = serde_json::from_value(json!({
            "status": "success",
            "server_nonce": 7,
            "signature": "c2ln"
        }))
        .unwrap();
        assert_eq!(resp.server_nonce, 7);
    }

    #[test]
    fn test_large_nonce_survives_json() {
        let resp = ChallengeResponse::new(u64::MAX);
        let text = serde_json::to_string(&resp).unwrap();
        let back: ChallengeResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(back.nonce, u64::MAX);
    }
}
