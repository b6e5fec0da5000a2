//! Protocol implementation.
//!
//! [`Authenticator`] is the server role. The free functions build the
//! client's side of each exchange.

use crate::challenge::{Challenge, ChallengeStore};
use crate::error::{AuthError, Result};
use crate::messages::{
    ChallengeRequest, MessageRequest, MessageResponse, MutualInitRequest, MutualInitResponse,
    RegisterRequest, STATUS_SUCCESS, TimestampAuthRequest, VerifyRequest, challenge_message,
    mutual_message, required, timestamp_message,
};
use crate::registry::Registry;
use crate::session::SessionState;
use chrono::Utc;
use sigauth_core::signing::{sign_b64, verify_b64};
use sigauth_core::{KeyPair, Nonce, PrivateKey, PublicKey, generate_nonce};
use tracing::{debug, info};

/// Default timestamp tolerance (±5 minutes).
pub const DEFAULT_TIMESTAMP_TOLERANCE_SECS: u64 = 300;

/// Server side of all three protocols.
///
/// Owns the server key pair and the registry, challenge and session stores.
/// Every method is safe to call concurrently.
pub struct Authenticator {
    server_key: KeyPair,
    registry: Registry,
    challenges: ChallengeStore,
    sessions: SessionState,
    timestamp_tolerance_secs: u64,
}

impl Authenticator {
    pub fn new(server_key: KeyPair) -> Self {
        Self {
            server_key,
            registry: Registry::new(),
            challenges: ChallengeStore::new(),
            sessions: SessionState::new(),
            timestamp_tolerance_secs: DEFAULT_TIMESTAMP_TOLERANCE_SECS,
        }
    }

    /// Override the allowed clock skew for the timestamp protocol.
    pub fn with_timestamp_tolerance(mut self, secs: u64) -> Self {
        self.timestamp_tolerance_secs = secs;
        self
    }

    pub fn server_public_key(&self) -> &PublicKey {
        self.server_key.public_key()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn challenges(&self) -> &ChallengeStore {
        &self.challenges
    }

    pub fn sessions(&self) -> &SessionState {
        &self.sessions
    }

    pub fn is_authenticated(&self, client_id: &str) -> bool {
        self.sessions.is_authenticated(client_id)
    }

    /// Register (or re-register) a client's public key.
    pub fn register(&self, req: &RegisterRequest) -> Result<()> {
        let client_id = required(&req.client_id, "client_id")?;
        let pem = required(&req.public_key, "public_key")?;

        let public_key =
            PublicKey::from_pem(pem).map_err(|e| AuthError::InvalidPublicKey(e.to_string()))?;
        let fingerprint = public_key.short_fingerprint();

        match self.registry.register(client_id, public_key)? {
            Some(previous) => info!(
                client_id,
                fingerprint = %fingerprint,
                previous = %previous.short_fingerprint(),
                "Client re-registered, previous key replaced"
            ),
            None => info!(client_id, fingerprint = %fingerprint, "Client registered"),
        }
        Ok(())
    }

    /// Protocol 1: verify a signed timestamp against the current time.
    pub fn verify_timestamp(&self, req: &TimestampAuthRequest) -> Result<()> {
        self.verify_timestamp_at(req, Utc::now().timestamp())
    }

    /// Protocol 1 with an explicit server time, in Unix seconds.
    pub fn verify_timestamp_at(&self, req: &TimestampAuthRequest, now: i64) -> Result<()> {
        let (client_id, timestamp, signature) = req.fields()?;
        let public_key = self.registry.lookup(client_id)?;

        if now.abs_diff(timestamp) > self.timestamp_tolerance_secs {
            return Err(AuthError::StaleTimestamp { timestamp, now });
        }

        let message = timestamp_message(client_id, timestamp);
        verify_b64(&public_key, message.as_bytes(), signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        self.authenticate(client_id, "timestamp");
        Ok(())
    }

    /// Protocol 2, step A: issue a nonce for the client to sign.
    pub fn issue_challenge(&self, req: &ChallengeRequest) -> Result<Nonce> {
        let client_id = required(&req.client_id, "client_id")?;
        self.require_registered(client_id)?;

        let nonce = generate_nonce()?;
        if let Some(previous) = self.challenges.issue(client_id, Challenge::OneWay { nonce }) {
            debug!(client_id, ?previous, "Pending challenge replaced");
        }
        Ok(nonce)
    }

    /// Protocol 2, step B: verify the signed nonce.
    ///
    /// A bad signature leaves the challenge pending.
    pub fn verify_challenge(&self, req: &VerifyRequest) -> Result<()> {
        let (client_id, signature) = req.fields()?;
        let public_key = self.registry.lookup(client_id)?;

        let challenge = self.pending(client_id)?;
        let Challenge::OneWay { nonce } = challenge else {
            return Err(AuthError::NoActiveChallenge(client_id.to_string()));
        };

        verify_b64(&public_key, challenge_message(nonce).as_bytes(), signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        self.consume(client_id, &challenge)?;
        self.authenticate(client_id, "challenge");
        Ok(())
    }

    /// Protocol 3, step A: pair the client's nonce with a fresh server nonce
    /// and sign both.
    pub fn init_mutual(&self, req: &MutualInitRequest) -> Result<MutualInitResponse> {
        let (client_id, client_nonce) = req.fields()?;
        self.require_registered(client_id)?;

        let server_nonce = generate_nonce()?;
        let message = mutual_message(client_id, client_nonce, server_nonce);
        let signature = sign_b64(self.server_key.private_key(), message.as_bytes())?;

        let challenge = Challenge::Mutual {
            client_nonce,
            server_nonce,
        };
        if let Some(previous) = self.challenges.issue(client_id, challenge) {
            debug!(client_id, ?previous, "Pending challenge replaced");
        }

        Ok(MutualInitResponse {
            status: STATUS_SUCCESS.to_string(),
            server_nonce,
            signature,
        })
    }

    /// Protocol 3, step B: verify the client's signature over the same
    /// message the server signed in step A.
    pub fn verify_mutual(&self, req: &VerifyRequest) -> Result<()> {
        let (client_id, signature) = req.fields()?;
        let public_key = self.registry.lookup(client_id)?;

        let challenge = self.pending(client_id)?;
        let Challenge::Mutual {
            client_nonce,
            server_nonce,
        } = challenge
        else {
            return Err(AuthError::NoActiveChallenge(client_id.to_string()));
        };

        let message = mutual_message(client_id, client_nonce, server_nonce);
        verify_b64(&public_key, message.as_bytes(), signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        self.consume(client_id, &challenge)?;
        self.authenticate(client_id, "mutual");
        Ok(())
    }

    /// Post-auth echo: reverse the message for an authenticated client.
    pub fn echo(&self, req: &MessageRequest) -> Result<MessageResponse> {
        let client_id = required(&req.client_id, "client_id")?;
        let message = required(&req.message, "message")?;

        if !self.sessions.is_authenticated(client_id) {
            return Err(AuthError::Unauthenticated(client_id.to_string()));
        }

        Ok(MessageResponse {
            status: STATUS_SUCCESS.to_string(),
            original_message: message.to_string(),
            reversed_message: reverse_message(message),
        })
    }

    fn require_registered(&self, client_id: &str) -> Result<()> {
        if self.registry.contains(client_id) {
            Ok(())
        } else {
            Err(AuthError::NotRegistered(client_id.to_string()))
        }
    }

    fn pending(&self, client_id: &str) -> Result<Challenge> {
        self.challenges
            .get(client_id)
            .ok_or_else(|| AuthError::NoActiveChallenge(client_id.to_string()))
    }

    fn consume(&self, client_id: &str, challenge: &Challenge) -> Result<()> {
        // Lost a race with a re-issue or another successful verify.
        if !self.challenges.consume(client_id, challenge) {
            return Err(AuthError::NoActiveChallenge(client_id.to_string()));
        }
        Ok(())
    }

    fn authenticate(&self, client_id: &str, method: &str) {
        self.sessions.mark_authenticated(client_id);
        info!(client_id, method, "Client authenticated");
    }
}

/// Reverse `text` by Unicode scalar value.
pub fn reverse_message(text: &str) -> String {
    text.chars().rev().collect()
}

/// Build a signed timestamp request.
pub fn sign_timestamp(
    client_id: &str,
    timestamp: i64,
    key: &PrivateKey,
) -> Result<TimestampAuthRequest> {
    let message = timestamp_message(client_id, timestamp);
    let signature = sign_b64(key, message.as_bytes())?;
    Ok(TimestampAuthRequest::new(client_id, timestamp, signature))
}

/// Sign a one-way challenge nonce.
pub fn sign_challenge(client_id: &str, nonce: Nonce, key: &PrivateKey) -> Result<VerifyRequest> {
    let signature = sign_b64(key, challenge_message(nonce).as_bytes())?;
    Ok(VerifyRequest::new(client_id, signature))
}

/// Check the server's step-A signature in the mutual protocol.
///
/// The client must not continue to step B if this fails.
pub fn verify_server_signature(
    server_key: &PublicKey,
    client_id: &str,
    client_nonce: Nonce,
    response: &MutualInitResponse,
) -> Result<()> {
    let message = mutual_message(client_id, client_nonce, response.server_nonce);
    verify_b64(server_key, message.as_bytes(), &response.signature)
        .map_err(|_| AuthError::InvalidServerSignature)
}

/// Sign the mutual message for step B.
pub fn sign_mutual(
    client_id: &str,
    client_nonce: Nonce,
    server_nonce: Nonce,
    key: &PrivateKey,
) -> Result<VerifyRequest> {
    let message = mutual_message(client_id, client_nonce, server_nonce);
    let signature = sign_b64(key, message.as_bytes())?;
    Ok(VerifyRequest::new(client_id, signature))
}
