//! Request/response transports.
//!
//! The client is synchronous: every call blocks until the server answers.

use crate::error::{ClientError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sigauth_handshake::messages::{
    ChallengeResponse, ErrorResponse, MSG_AUTHENTICATED, MSG_MUTUALLY_AUTHENTICATED,
    MSG_REGISTERED, PublicKeyResponse, StatusResponse, paths,
};
use sigauth_handshake::{AuthError, Authenticator};
use std::sync::Arc;
use std::time::Duration;

/// A JSON request/response channel to an authentication server.
///
/// Non-2xx answers surface as [`ClientError::Rejected`] carrying the
/// server's `error` text.
pub trait Transport {
    fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R>;

    fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R>;
}

/// Blocking HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    /// `timeout` of `None` waits indefinitely.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn handle<R: DeserializeOwned>(response: reqwest::blocking::Response) -> Result<R> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json()?);
        }

        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl Transport for HttpTransport {
    fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let response = self.http.get(self.url(path)).send()?;
        Self::handle(response)
    }

    fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let response = self.http.post(self.url(path)).json(body).send()?;
        Self::handle(response)
    }
}

/// In-process transport that routes requests straight to an [`Authenticator`],
/// with the same paths, bodies and status codes as the HTTP service.
#[derive(Clone)]
pub struct LocalTransport {
    server: Arc<Authenticator>,
}

impl LocalTransport {
    pub fn new(server: Arc<Authenticator>) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &Authenticator {
        &self.server
    }

    fn route(&self, path: &str, body: Value) -> Result<Value> {
        let server = &self.server;
        let response = match path {
            paths::REGISTER => {
                server.register(&parse(body)?).map_err(rejected)?;
                serde_json::to_value(StatusResponse::success(MSG_REGISTERED))
            }
            paths::AUTH_TIMESTAMP => {
                server.verify_timestamp(&parse(body)?).map_err(rejected)?;
                serde_json::to_value(StatusResponse::success(MSG_AUTHENTICATED))
            }
            paths::AUTH_CHALLENGE => {
                let nonce = server.issue_challenge(&parse(body)?).map_err(rejected)?;
                serde_json::to_value(ChallengeResponse::new(nonce))
            }
            paths::AUTH_CHALLENGE_VERIFY => {
                server.verify_challenge(&parse(body)?).map_err(rejected)?;
                serde_json::to_value(StatusResponse::success(MSG_AUTHENTICATED))
            }
            paths::AUTH_MUTUAL => {
                let response = server.init_mutual(&parse(body)?).map_err(rejected)?;
                serde_json::to_value(response)
            }
            paths::AUTH_MUTUAL_VERIFY => {
                server.verify_mutual(&parse(body)?).map_err(rejected)?;
                serde_json::to_value(StatusResponse::success(MSG_MUTUALLY_AUTHENTICATED))
            }
            paths::MESSAGE => {
                let response = server.echo(&parse(body)?).map_err(rejected)?;
                serde_json::to_value(response)
            }
            _ => return Err(not_found(path)),
        };
        Ok(response?)
    }
}

impl Transport for LocalTransport {
    fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        if path != paths::SERVER_PUBLIC_KEY {
            return Err(not_found(path));
        }
        let public_key = self.server.server_public_key().to_pem()?;
        let value = serde_json::to_value(PublicKeyResponse { public_key })?;
        Ok(serde_json::from_value(value)?)
    }

    fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let value = self.route(path, serde_json::to_value(body)?)?;
        Ok(serde_json::from_value(value)?)
    }
}

fn parse<T: DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| ClientError::Rejected {
        status: 400,
        message: e.to_string(),
    })
}

fn rejected(e: AuthError) -> ClientError {
    ClientError::Rejected {
        status: e.status_code(),
        message: e.to_string(),
    }
}

fn not_found(path: &str) -> ClientError {
    ClientError::Rejected {
        status: 404,
        message: format!("Not found: {}", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sigauth_core::KeyPair;

    fn local() -> LocalTransport {
        let server = Authenticator::new(KeyPair::generate_with_bits(1024).unwrap());
        LocalTransport::new(Arc::new(server))
    }

    #[test]
    fn test_local_server_key() {
        let transport = local();
        let resp: PublicKeyResponse = transport.get(paths::SERVER_PUBLIC_KEY).unwrap();
        assert!(resp.public_key.starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn test_local_status_codes() {
        let transport = local();

        let missing = transport
            .post::<_, Value>(paths::REGISTER, &json!({"client_id": "alice"}))
            .unwrap_err();
        assert_eq!(missing.status(), Some(400));

        let unknown = transport
            .post::<_, Value>(paths::AUTH_CHALLENGE, &json!({"client_id": "alice"}))
            .unwrap_err();
        assert_eq!(unknown.status(), Some(401));

        let wrong_type = transport
            .post::<_, Value>(paths::AUTH_TIMESTAMP, &json!({"timestamp": "soon"}))
            .unwrap_err();
        assert_eq!(wrong_type.status(), Some(400));

        let not_found = transport.get::<Value>("/nope").unwrap_err();
        assert_eq!(not_found.status(), Some(404));
    }

    #[test]
    fn test_http_base_url_normalized() {
        let transport = HttpTransport::new("http://127.0.0.1:8080/", None).unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:8080");
        assert_eq!(transport.url(paths::REGISTER), "http://127.0.0.1:8080/register");
    }
}
