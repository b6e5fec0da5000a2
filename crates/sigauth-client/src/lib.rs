//! Client side of the sigauth protocols.
//!
//! [`Client`] drives registration, the three authentication protocols and
//! the post-auth echo over a [`Transport`]: [`HttpTransport`] for a remote
//! server, [`LocalTransport`] for an in-process [`Authenticator`].
//!
//! [`Authenticator`]: sigauth_handshake::Authenticator

pub mod client;
pub mod error;
pub mod transport;

pub use client::{AuthMethod, Client, ClientConfig, DEFAULT_SERVER_URL};
pub use error::{ClientError, Result};
pub use transport::{HttpTransport, LocalTransport, Transport};
