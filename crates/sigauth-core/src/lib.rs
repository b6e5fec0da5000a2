//! # sigauth-core
//!
//! Core identity primitives for sigauth.
//!
//! This crate provides:
//! - RSA key generation and PEM encoding
//! - On-disk key storage per identity
//! - SHA-256 / PKCS#1 v1.5 signing with a base64 wire form
//! - Nonce generation from the OS random source

pub mod error;
pub mod keys;
pub mod keystore;
pub mod nonce;
pub mod signing;

pub use error::Error;
pub use keys::{KeyPair, PrivateKey, PublicKey, RSA_KEY_BITS};
pub use keystore::KeyStore;
pub use nonce::{Nonce, generate_nonce};

/// Result type for sigauth-core operations.
pub type Result<T> = std::result::Result<T, Error>;
