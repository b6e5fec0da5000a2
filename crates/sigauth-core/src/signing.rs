//! Base64 wire form of signatures.
//!
//! Every signature in the protocol is SHA-256 / PKCS#1 v1.5, carried in JSON
//! as standard padded base64.

use crate::keys::{PrivateKey, PublicKey};
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Sign `message` and return the base64 signature.
pub fn sign_b64(key: &PrivateKey, message: &[u8]) -> Result<String> {
    Ok(encode_signature(&key.sign(message)?))
}

/// Verify a base64 signature over `message`.
///
/// Undecodable input is an [`Error::InvalidSignature`], same as a bad signature.
pub fn verify_b64(key: &PublicKey, message: &[u8], signature: &str) -> Result<()> {
    let bytes = decode_signature(signature)?;
    key.verify(message, &bytes)
}

pub fn encode_signature(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_signature(signature: &str) -> Result<Vec<u8>> {
    if signature.is_empty() {
        return Err(Error::InvalidSignature);
    }
    STANDARD
        .decode(signature)
        .map_err(|_| Error::InvalidSignature)
}
