//! End-to-end tests: the client engine against an in-process server.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sigauth::client::{LocalTransport, Transport};
use sigauth::handshake::messages::{RegisterRequest, TimestampAuthRequest, VerifyRequest, paths};
use sigauth::handshake::protocol::sign_timestamp;
use sigauth::{
    AuthError, AuthMethod, Authenticator, Client, ClientConfig, ClientError, KeyPair, KeyStore,
};
use std::cell::RefCell;
use std::sync::Arc;

fn key_pair() -> KeyPair {
    KeyPair::generate_with_bits(1024).unwrap()
}

fn server() -> LocalTransport {
    LocalTransport::new(Arc::new(Authenticator::new(key_pair())))
}

fn connected(id: &str, transport: LocalTransport) -> Client<LocalTransport> {
    let mut client = Client::new(id, key_pair(), transport);
    client.fetch_server_public_key().unwrap();
    client.register().unwrap();
    client
}

/// Keeps a copy of every request body sent through it.
struct Recording {
    inner: LocalTransport,
    sent: RefCell<Vec<(String, serde_json::Value)>>,
}

impl Recording {
    fn new(inner: LocalTransport) -> Self {
        Self {
            inner,
            sent: RefCell::new(Vec::new()),
        }
    }

    fn last_body(&self, path: &str) -> serde_json::Value {
        self.sent
            .borrow()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .unwrap()
    }
}

impl Transport for Recording {
    fn get<R: DeserializeOwned>(&self, path: &str) -> sigauth::client::Result<R> {
        self.inner.get(path)
    }

    fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> sigauth::client::Result<R> {
        self.sent
            .borrow_mut()
            .push((path.to_string(), serde_json::to_value(body)?));
        self.inner.post(path, body)
    }
}

#[test]
fn test_full_session_each_method() {
    let transport = server();

    for method in AuthMethod::ALL {
        let id = format!("agent-{}", method);
        let mut client = connected(&id, transport.clone());

        assert!(client.send_message("hello").is_err());
        assert!(client.authenticate(method));

        let reply = client.send_message("hello").unwrap();
        assert_eq!(reply.original_message, "hello");
        assert_eq!(reply.reversed_message, "olleh");
    }

    assert_eq!(transport.server().sessions().count(), 3);
}

#[test]
fn test_server_rejects_echo_before_auth() {
    let transport = server();
    let _client = connected("alice", transport.clone());

    let err = transport
        .post::<_, serde_json::Value>(
            paths::MESSAGE,
            &serde_json::json!({"client_id": "alice", "message": "hello"}),
        )
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[test]
fn test_challenge_replay_rejected() {
    let recording = Recording::new(server());
    let mut client = Client::new("alice", key_pair(), recording);
    client.fetch_server_public_key().unwrap();
    client.register().unwrap();
    client.authenticate_with_challenge().unwrap();

    let transport = client.transport();
    let body = transport.last_body(paths::AUTH_CHALLENGE_VERIFY);
    let replayed: VerifyRequest = serde_json::from_value(body).unwrap();

    let err = transport
        .inner
        .post::<_, serde_json::Value>(paths::AUTH_CHALLENGE_VERIFY, &replayed)
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("No active challenge"));
}

#[test]
fn test_timestamp_replay_within_window_accepted() {
    // Timestamp auth has no replay cache: the same signed request is valid
    // until it leaves the freshness window.
    let recording = Recording::new(server());
    let mut client = Client::new("alice", key_pair(), recording);
    client.fetch_server_public_key().unwrap();
    client.register().unwrap();
    client.authenticate_with_timestamp().unwrap();

    let transport = client.transport();
    let body = transport.last_body(paths::AUTH_TIMESTAMP);
    let replayed: TimestampAuthRequest = serde_json::from_value(body).unwrap();
    let _: serde_json::Value = transport
        .inner
        .post(paths::AUTH_TIMESTAMP, &replayed)
        .unwrap();
}

#[test]
fn test_timestamp_window_edges() {
    let transport = server();
    let keys = key_pair();
    let pem = keys.public_key().to_pem().unwrap();
    transport.server().register(&RegisterRequest::new("alice", pem)).unwrap();

    let now = 1_700_000_000;
    for (offset, accepted) in [(0, true), (300, true), (-300, true), (301, false), (-301, false)] {
        let req = sign_timestamp("alice", now + offset, keys.private_key()).unwrap();
        let result = transport.server().verify_timestamp_at(&req, now);
        assert_eq!(result.is_ok(), accepted, "offset {}", offset);
        if !accepted {
            assert!(matches!(result, Err(AuthError::StaleTimestamp { .. })));
        }
    }
}

#[test]
fn test_reregistration_replaces_key() {
    let transport = server();
    let mut old = connected("alice", transport.clone());
    let mut new = connected("alice", transport.clone());

    assert!(!old.authenticate(AuthMethod::Challenge));
    assert!(new.authenticate(AuthMethod::Challenge));

    assert!(!old.authenticate(AuthMethod::Timestamp));
    assert!(new.authenticate(AuthMethod::Mutual));
}

#[test]
fn test_impostor_cannot_authenticate() {
    let transport = server();
    let _alice = connected("alice", transport.clone());

    // Mallory claims alice's id without ever registering it.
    let mut mallory = Client::new("alice", key_pair(), transport.clone());
    mallory.fetch_server_public_key().unwrap();

    for method in AuthMethod::ALL {
        let err = mallory.authenticate_with(method).unwrap_err();
        assert_eq!(err.status(), Some(401), "{}", method);
    }
    assert!(!transport.server().is_authenticated("alice"));
}

#[test]
fn test_register_without_public_key() {
    let transport = server();
    let err = transport
        .post::<_, serde_json::Value>(paths::REGISTER, &serde_json::json!({"client_id": "alice"}))
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("public_key"));
}

#[test]
fn test_mutual_against_wrong_server_fails_closed() {
    let genuine = server();
    let rogue = server();

    // Client trusts the genuine server's key but talks to the rogue one.
    let mut client = connected("alice", rogue.clone());
    let pinned = genuine.server().server_public_key().clone();
    client = client.with_server_key(pinned);

    let err = client.authenticate_mutual().unwrap_err();
    assert!(matches!(
        err,
        ClientError::Auth(AuthError::InvalidServerSignature)
    ));
    assert!(!client.is_authenticated());
    assert!(!rogue.server().is_authenticated("alice"));
    assert!(rogue.server().challenges().get("alice").is_some());
}

#[test]
fn test_bootstrap_with_key_dir() {
    let dir = tempfile::tempdir().unwrap();
    let transport = server();
    let config = ClientConfig::new("alice", dir.path());
    KeyStore::client(dir.path()).ensure_keys_with_bits(1024).unwrap();

    let mut first = Client::bootstrap(&config, transport.clone()).unwrap();
    assert!(first.authenticate(AuthMethod::Timestamp));

    // A second start reuses the stored keys.
    let second = Client::bootstrap(&config, transport.clone()).unwrap();
    assert_eq!(first.keys().public_key(), second.keys().public_key());
    assert!(config.server_key_path().exists());
}
