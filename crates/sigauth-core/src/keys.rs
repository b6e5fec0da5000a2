//! RSA key material for sigauth identities.
//!
//! # Security
//!
//! - **Zeroization on drop**: `rsa::RsaPrivateKey` zeroes its secret
//!   components when dropped, and PEM exports of private keys are handed out
//!   only as `Zeroizing` buffers written straight to disk.
//! - **No Debug leakage**: key types print only a public-key fingerprint.

use crate::{Error, Result};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;

/// Modulus size for freshly generated identity keys.
pub const RSA_KEY_BITS: usize = 2048;

/// The private half of an identity key.
///
/// Never leaves the identity that owns it: there is no way to get the PEM
/// text back as a plain `String`.
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("fingerprint", &self.public_key().short_fingerprint())
            .finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Generate a new random key of [`RSA_KEY_BITS`] bits.
    pub fn generate() -> Result<Self> {
        Self::generate_with_bits(RSA_KEY_BITS)
    }

    /// Generate a new random key with an explicit modulus size.
    pub fn generate_with_bits(bits: usize) -> Result<Self> {
        let inner = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Parse a PEM private key, PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let pem = pem.trim();
        let inner = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| Error::KeyEncoding(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Encode as PKCS#1 PEM, zeroized when the returned buffer drops.
    pub(crate) fn to_pem(&self) -> Result<impl std::ops::Deref<Target = String>> {
        self.inner
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| Error::KeyEncoding(e.to_string()))
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: self.inner.to_public_key(),
        }
    }

    /// Sign `message` with SHA-256 and PKCS#1 v1.5 padding.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signing_key = SigningKey::<Sha256>::new(self.inner.clone());
        let signature = signing_key
            .try_sign(message)
            .map_err(|e| Error::Signing(e.to_string()))?;
        Ok(signature.to_vec())
    }
}

/// The public half of an identity key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: RsaPublicKey,
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("fingerprint", &self.short_fingerprint())
            .field("bits", &(self.inner.size() * 8))
            .finish()
    }
}

impl PublicKey {
    /// Parse a PEM public key, SubjectPublicKeyInfo (`PUBLIC KEY`) or
    /// PKCS#1 (`RSA PUBLIC KEY`).
    pub fn from_pem(pem: &str) -> Result<Self> {
        let pem = pem.trim();
        let inner = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| Error::KeyEncoding(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Encode as SubjectPublicKeyInfo PEM.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| Error::KeyEncoding(e.to_string()))
    }

    /// Hex SHA-256 of the big-endian modulus.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.inner.n().to_bytes_be()))
    }

    /// First 16 hex characters of [`fingerprint`](Self::fingerprint), for logs.
    pub fn short_fingerprint(&self) -> String {
        let mut full = self.fingerprint();
        full.truncate(16);
        full
    }

    /// Verify a SHA-256 / PKCS#1 v1.5 signature over `message`.
    ///
    /// Empty, truncated or otherwise malformed signatures are rejected with
    /// [`Error::InvalidSignature`].
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        if signature.len() != self.inner.size() {
            return Err(Error::InvalidSignature);
        }
        let signature = Signature::try_from(signature).map_err(|_| Error::InvalidSignature)?;
        VerifyingKey::<Sha256>::new(self.inner.clone())
            .verify(message, &signature)
            .map_err(|_| Error::InvalidSignature)
    }
}

/// A private key together with its public half.
#[derive(Debug)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh [`RSA_KEY_BITS`]-bit key pair.
    pub fn generate() -> Result<Self> {
        PrivateKey::generate().map(Self::from_private)
    }

    /// Generate a key pair with an explicit modulus size.
    pub fn generate_with_bits(bits: usize) -> Result<Self> {
        PrivateKey::generate_with_bits(bits).map(Self::from_private)
    }

    /// Build a pair from an existing private key.
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
}
