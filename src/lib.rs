//! # sigauth
//!
//! Signature-based client/server authentication with RSA keys.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sigauth::{Client, ClientConfig, AuthMethod};
//!
//! let config = ClientConfig::new("alice", "./keys");
//! let mut client = Client::connect(&config)?;
//! if client.authenticate(AuthMethod::Mutual) {
//!     let reply = client.send_message("hello")?;
//!     println!("{}", reply.reversed_message);
//! }
//! # Ok::<(), sigauth::client::ClientError>(())
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Keys, key storage, signing, nonces
//! - [`handshake`] - The three protocols and the server-side stores
//! - [`client`] - Client engine and transports

pub use sigauth_client as client;
pub use sigauth_core as core;
pub use sigauth_handshake as handshake;

// Re-export common types at root
pub use sigauth_client::{AuthMethod, Client, ClientConfig, ClientError};
pub use sigauth_core::{KeyPair, KeyStore, PrivateKey, PublicKey};
pub use sigauth_handshake::{AuthError, Authenticator};
