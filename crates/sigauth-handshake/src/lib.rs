//! Authentication protocols for sigauth.
//!
//! Three ways for a client to prove possession of its registered RSA key:
//!
//! 1. **Timestamp**: one request carrying a signed `client_id:timestamp`.
//! 2. **Challenge**: the server issues a nonce, the client signs it.
//! 3. **Mutual**: client and server each contribute a nonce; the server signs
//!    first, the client verifies that before signing the same message.
//!
//! # Example
//!
//! ```no_run
//! use sigauth_core::KeyPair;
//! use sigauth_handshake::messages::{ChallengeRequest, RegisterRequest};
//! use sigauth_handshake::protocol::{Authenticator, sign_challenge};
//!
//! let server = Authenticator::new(KeyPair::generate().unwrap());
//! let client = KeyPair::generate().unwrap();
//!
//! let pem = client.public_key().to_pem().unwrap();
//! server.register(&RegisterRequest::new("alice", pem)).unwrap();
//!
//! let nonce = server.issue_challenge(&ChallengeRequest::new("alice")).unwrap();
//! let response = sign_challenge("alice", nonce, client.private_key()).unwrap();
//! server.verify_challenge(&response).unwrap();
//! assert!(server.is_authenticated("alice"));
//! ```

pub mod challenge;
pub mod error;
pub mod messages;
pub mod protocol;
pub mod registry;
pub mod session;

pub use challenge::{Challenge, ChallengeStore};
pub use error::{AuthError, Result};
pub use protocol::{Authenticator, DEFAULT_TIMESTAMP_TOLERANCE_SECS};
pub use registry::Registry;
pub use session::SessionState;
