//! The client engine.

use crate::error::{ClientError, Result};
use crate::transport::{HttpTransport, Transport};
use chrono::Utc;
use sigauth_core::keystore::write_public_key;
use sigauth_core::{KeyPair, KeyStore, PublicKey, generate_nonce};
use sigauth_handshake::AuthError;
use sigauth_handshake::messages::{
    ChallengeRequest, ChallengeResponse, MessageRequest, MessageResponse, MutualInitRequest,
    MutualInitResponse, PublicKeyResponse, RegisterRequest, StatusResponse, paths,
};
use sigauth_handshake::protocol::{
    sign_challenge, sign_mutual, sign_timestamp, verify_server_signature,
};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Server the client talks to when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

/// File name the fetched server key is persisted under.
pub const SERVER_KEY_FILE: &str = "server_public_key.pem";

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: String,
    pub server_url: String,
    /// Directory holding the client key pair and the server's public key.
    pub key_dir: PathBuf,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(client_id: impl Into<String>, key_dir: impl Into<PathBuf>) -> Self {
        Self {
            client_id: client_id.into(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            key_dir: key_dir.into(),
            timeout: None,
        }
    }

    pub fn server_key_path(&self) -> PathBuf {
        self.key_dir.join(SERVER_KEY_FILE)
    }
}

/// Which protocol to authenticate with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Timestamp,
    Challenge,
    Mutual,
}

impl AuthMethod {
    pub const ALL: [AuthMethod; 3] = [Self::Timestamp, Self::Challenge, Self::Mutual];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Challenge => "challenge",
            Self::Mutual => "mutual",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown auth method '{}' (timestamp, challenge, mutual)", s))
    }
}

/// A client identity bound to one server.
///
/// Every protocol step is a separate method so callers can drive (or break)
/// each exchange on its own. `authenticated` only reflects protocol runs
/// completed by this value.
pub struct Client<T: Transport = HttpTransport> {
    client_id: String,
    keys: KeyPair,
    server_key: Option<PublicKey>,
    transport: T,
    authenticated: bool,
}

impl Client<HttpTransport> {
    /// Start-up sequence against an HTTP server: load or create the client
    /// keys, fetch and persist the server key, then register.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.server_url, config.timeout)?;
        Self::bootstrap(config, transport)
    }
}

impl<T: Transport> Client<T> {
    pub fn new(client_id: impl Into<String>, keys: KeyPair, transport: T) -> Self {
        Self {
            client_id: client_id.into(),
            keys,
            server_key: None,
            transport,
            authenticated: false,
        }
    }

    /// Skip fetching the server key, e.g. when it was pinned out of band.
    pub fn with_server_key(mut self, server_key: PublicKey) -> Self {
        self.server_key = Some(server_key);
        self
    }

    /// [`Client::connect`] over any transport.
    pub fn bootstrap(config: &ClientConfig, transport: T) -> Result<Self> {
        let keys = KeyStore::client(&config.key_dir).ensure_keys()?;
        let mut client = Self::new(&config.client_id, keys, transport);

        let server_key = client.fetch_server_public_key()?;
        write_public_key(&config.server_key_path(), &server_key)?;

        client.register()?;
        Ok(client)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn server_key(&self) -> Option<&PublicKey> {
        self.server_key.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Fetch the server's public key and remember it for mutual auth.
    pub fn fetch_server_public_key(&mut self) -> Result<PublicKey> {
        let resp: PublicKeyResponse = self.transport.get(paths::SERVER_PUBLIC_KEY)?;
        let key = PublicKey::from_pem(&resp.public_key)?;
        info!(fingerprint = %key.short_fingerprint(), "Fetched server public key");
        self.server_key = Some(key.clone());
        Ok(key)
    }

    /// Register this client's public key under its id.
    pub fn register(&self) -> Result<()> {
        let pem = self.keys.public_key().to_pem()?;
        let req = RegisterRequest::new(&self.client_id, pem);
        let resp: StatusResponse = self.transport.post(paths::REGISTER, &req)?;
        info!(client_id = %self.client_id, message = %resp.message, "Registered");
        Ok(())
    }

    /// Protocol 1: sign the current time.
    pub fn authenticate_with_timestamp(&mut self) -> Result<()> {
        let timestamp = Utc::now().timestamp();
        let req = sign_timestamp(&self.client_id, timestamp, self.keys.private_key())?;
        let _: StatusResponse = self.transport.post(paths::AUTH_TIMESTAMP, &req)?;
        self.authenticated = true;
        Ok(())
    }

    /// Protocol 2: request a nonce and sign it.
    pub fn authenticate_with_challenge(&mut self) -> Result<()> {
        let challenge: ChallengeResponse = self
            .transport
            .post(paths::AUTH_CHALLENGE, &ChallengeRequest::new(&self.client_id))?;
        debug!(client_id = %self.client_id, nonce = challenge.nonce, "Challenge received");

        let req = sign_challenge(&self.client_id, challenge.nonce, self.keys.private_key())?;
        let _: StatusResponse = self.transport.post(paths::AUTH_CHALLENGE_VERIFY, &req)?;
        self.authenticated = true;
        Ok(())
    }

    /// Protocol 3: exchange nonces, check the server's signature, then sign
    /// the same message.
    ///
    /// Stops before the verify step if the server's signature does not check
    /// out under the fetched server key.
    pub fn authenticate_mutual(&mut self) -> Result<()> {
        let server_key = self
            .server_key
            .clone()
            .ok_or(ClientError::MissingServerKey)?;

        let client_nonce = generate_nonce()?;
        let init: MutualInitResponse = self.transport.post(
            paths::AUTH_MUTUAL,
            &MutualInitRequest::new(&self.client_id, client_nonce),
        )?;

        verify_server_signature(&server_key, &self.client_id, client_nonce, &init)?;
        debug!(client_id = %self.client_id, "Server signature verified");

        let req = sign_mutual(
            &self.client_id,
            client_nonce,
            init.server_nonce,
            self.keys.private_key(),
        )?;
        let _: StatusResponse = self.transport.post(paths::AUTH_MUTUAL_VERIFY, &req)?;
        self.authenticated = true;
        Ok(())
    }

    /// Run the protocol named by `method`.
    pub fn authenticate_with(&mut self, method: AuthMethod) -> Result<()> {
        match method {
            AuthMethod::Timestamp => self.authenticate_with_timestamp(),
            AuthMethod::Challenge => self.authenticate_with_challenge(),
            AuthMethod::Mutual => self.authenticate_mutual(),
        }
    }

    /// Run one protocol, logging instead of returning the failure.
    pub fn authenticate(&mut self, method: AuthMethod) -> bool {
        match self.authenticate_with(method) {
            Ok(()) => {
                info!(client_id = %self.client_id, %method, "Authentication successful");
                true
            }
            Err(e) => {
                warn!(client_id = %self.client_id, %method, error = %e, "Authentication failed");
                false
            }
        }
    }

    /// Send `text` to the echo endpoint. Refused locally until one protocol
    /// has succeeded.
    pub fn send_message(&self, text: &str) -> Result<MessageResponse> {
        if !self.authenticated {
            return Err(AuthError::Unauthenticated(self.client_id.clone()).into());
        }
        let req = MessageRequest::new(&self.client_id, text);
        self.transport.post(paths::MESSAGE, &req)
    }
}
