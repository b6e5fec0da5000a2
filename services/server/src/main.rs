//! sigauth authentication server
//!
//! Serves registration, the three authentication protocols and the post-auth
//! echo over HTTP/JSON. All state except the server key pair lives in memory.

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use sigauth_core::KeyStore;
use sigauth_handshake::messages::{
    ChallengeRequest, ChallengeResponse, ErrorResponse, MSG_AUTHENTICATED,
    MSG_MUTUALLY_AUTHENTICATED, MSG_REGISTERED, MessageRequest, MessageResponse,
    MutualInitRequest, MutualInitResponse, PublicKeyResponse, RegisterRequest, StatusResponse,
    TimestampAuthRequest, VerifyRequest, paths,
};
use sigauth_handshake::{AuthError, Authenticator, DEFAULT_TIMESTAMP_TOLERANCE_SECS};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sigauth-server")]
#[command(about = "Signature-based authentication server", version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "SIGAUTH_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Directory holding server_private_key.pem / server_public_key.pem
    #[arg(long, env = "SIGAUTH_KEY_DIR", default_value = ".")]
    key_dir: PathBuf,

    /// Accepted clock skew for timestamp authentication, in seconds
    #[arg(long, env = "SIGAUTH_TIMESTAMP_TOLERANCE", default_value_t = DEFAULT_TIMESTAMP_TOLERANCE_SECS)]
    timestamp_tolerance: u64,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub key_dir: PathBuf,
    pub timestamp_tolerance_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: ([0, 0, 0, 0], 8080).into(),
            key_dir: PathBuf::from("."),
            timestamp_tolerance_secs: DEFAULT_TIMESTAMP_TOLERANCE_SECS,
        }
    }
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            listen_addr: args.listen,
            key_dir: args.key_dir,
            timestamp_tolerance_secs: args.timestamp_tolerance,
        }
    }
}

/// Application state.
#[derive(Clone)]
pub struct AppState {
    auth: Arc<Authenticator>,
}

impl AppState {
    pub fn new(auth: Authenticator) -> Self {
        Self {
            auth: Arc::new(auth),
        }
    }
}

// === Errors ===

/// Handler failure, rendered as `{error}` with the matching status.
enum ApiError {
    BadBody(JsonRejection),
    Auth(AuthError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadBody(rejection)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // Wrong content type and unparsable JSON are both client mistakes.
            Self::BadBody(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            Self::Auth(err) => (
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                err.to_string(),
            ),
        };
        warn!(status = status.as_u16(), error = %message, "Request rejected");
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// === Handlers ===

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "sigauth-server"}))
}

async fn server_public_key(State(state): State<AppState>) -> ApiResult<PublicKeyResponse> {
    let public_key = state
        .auth
        .server_public_key()
        .to_pem()
        .map_err(AuthError::from)?;
    Ok(Json(PublicKeyResponse { public_key }))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let Json(req) = payload?;
    state.auth.register(&req)?;
    Ok(Json(StatusResponse::success(MSG_REGISTERED)))
}

async fn auth_timestamp(
    State(state): State<AppState>,
    payload: Result<Json<TimestampAuthRequest>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let Json(req) = payload?;
    state.auth.verify_timestamp(&req)?;
    Ok(Json(StatusResponse::success(MSG_AUTHENTICATED)))
}

async fn auth_challenge(
    State(state): State<AppState>,
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> ApiResult<ChallengeResponse> {
    let Json(req) = payload?;
    let nonce = state.auth.issue_challenge(&req)?;
    Ok(Json(ChallengeResponse::new(nonce)))
}

async fn auth_challenge_verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let Json(req) = payload?;
    state.auth.verify_challenge(&req)?;
    Ok(Json(StatusResponse::success(MSG_AUTHENTICATED)))
}

async fn auth_mutual(
    State(state): State<AppState>,
    payload: Result<Json<MutualInitRequest>, JsonRejection>,
) -> ApiResult<MutualInitResponse> {
    let Json(req) = payload?;
    Ok(Json(state.auth.init_mutual(&req)?))
}

async fn auth_mutual_verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let Json(req) = payload?;
    state.auth.verify_mutual(&req)?;
    Ok(Json(StatusResponse::success(MSG_MUTUALLY_AUTHENTICATED)))
}

async fn message(
    State(state): State<AppState>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(req) = payload?;
    Ok(Json(state.auth.echo(&req)?))
}

/// Build the router.
fn build_router(state: AppState) -> Router {
    Router::new()
        .route(paths::HEALTH, get(health))
        .route(paths::SERVER_PUBLIC_KEY, get(server_public_key))
        .route(paths::REGISTER, post(register))
        .route(paths::AUTH_TIMESTAMP, post(auth_timestamp))
        .route(paths::AUTH_CHALLENGE, post(auth_challenge))
        .route(paths::AUTH_CHALLENGE_VERIFY, post(auth_challenge_verify))
        .route(paths::AUTH_MUTUAL, post(auth_mutual))
        .route(paths::AUTH_MUTUAL_VERIFY, post(auth_mutual_verify))
        .route(paths::MESSAGE, post(message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from(Args::parse());

    let store = KeyStore::server(&config.key_dir);
    let keys = store
        .ensure_keys()
        .with_context(|| format!("loading server keys from {}", store.dir().display()))?;
    info!(
        fingerprint = %keys.public_key().short_fingerprint(),
        tolerance_secs = config.timestamp_tolerance_secs,
        "Server key ready"
    );

    let auth = Authenticator::new(keys).with_timestamp_tolerance(config.timestamp_tolerance_secs);
    let app = build_router(AppState::new(auth));

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!("sigauth server listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}
