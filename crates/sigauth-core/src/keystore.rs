//! On-disk key storage.
//!
//! Each identity owns two PEM files in a key directory:
//! `<identity>_private_key.pem` (PKCS#1) and `<identity>_public_key.pem`
//! (SubjectPublicKeyInfo).

use crate::keys::{KeyPair, PrivateKey, PublicKey, RSA_KEY_BITS};
use crate::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Key files for one identity.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
    identity: String,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>, identity: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            identity: identity.into(),
        }
    }

    /// Key store for the `client` identity.
    pub fn client(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, "client")
    }

    /// Key store for the `server` identity.
    pub fn server(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, "server")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn private_path(&self) -> PathBuf {
        self.dir.join(format!("{}_private_key.pem", self.identity))
    }

    pub fn public_path(&self) -> PathBuf {
        self.dir.join(format!("{}_public_key.pem", self.identity))
    }

    /// Load the key pair, generating and persisting one if none exists.
    pub fn ensure_keys(&self) -> Result<KeyPair> {
        self.ensure_keys_with_bits(RSA_KEY_BITS)
    }

    /// Like [`ensure_keys`](Self::ensure_keys) with an explicit modulus size
    /// for newly generated keys.
    pub fn ensure_keys_with_bits(&self, bits: usize) -> Result<KeyPair> {
        if self.private_path().exists() {
            let pair = KeyPair::from_private(self.load_private()?);
            if !self.public_path().exists() {
                // Public half went missing; re-derive rather than rotate.
                write_public_key(&self.public_path(), pair.public_key())?;
            }
            return Ok(pair);
        }

        info!(identity = %self.identity, bits, "Generating RSA key pair");
        let pair = KeyPair::generate_with_bits(bits)?;

        fs::create_dir_all(&self.dir).map_err(|source| Error::Io {
            path: self.dir.clone(),
            source,
        })?;
        write_private_key(&self.private_path(), pair.private_key())?;
        write_public_key(&self.public_path(), pair.public_key())?;

        info!(
            identity = %self.identity,
            fingerprint = %pair.public_key().short_fingerprint(),
            "Keys generated and saved"
        );
        Ok(pair)
    }

    /// Load the private half. Fails with `KeyFileMissing` before `ensure_keys`.
    pub fn load_private(&self) -> Result<PrivateKey> {
        PrivateKey::from_pem(&read_pem(&self.private_path())?)
    }

    /// Load the public half. Fails with `KeyFileMissing` before `ensure_keys`.
    pub fn load_public(&self) -> Result<PublicKey> {
        read_public_key(&self.public_path())
    }
}

/// Read a PEM public key from `path`.
pub fn read_public_key(path: &Path) -> Result<PublicKey> {
    PublicKey::from_pem(&read_pem(path)?)
}

/// Write a PEM public key to `path`.
pub fn write_public_key(path: &Path, key: &PublicKey) -> Result<()> {
    let pem = key.to_pem()?;
    fs::write(path, pem).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_private_key(path: &Path, key: &PrivateKey) -> Result<()> {
    let pem = key.to_pem()?;
    fs::write(path, pem.as_bytes()).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // Set restrictive permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| {
            Error::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
    }

    Ok(())
}

fn read_pem(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => Error::KeyFileMissing(path.to_path_buf()),
        _ => Error::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_before_ensure_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::client(dir.path());

        assert!(matches!(store.load_private(), Err(Error::KeyFileMissing(_))));
        assert!(matches!(store.load_public(), Err(Error::KeyFileMissing(_))));
    }

    #[test]
    fn test_ensure_generates_then_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::server(dir.path());

        let first = store.ensure_keys_with_bits(1024).unwrap();
        assert!(store.private_path().exists());
        assert!(store.public_path().exists());

        // Second call loads the same pair instead of regenerating.
        let second = store.ensure_keys_with_bits(1024).unwrap();
        assert_eq!(first.public_key(), second.public_key());

        assert_eq!(&store.load_public().unwrap(), first.public_key());
        assert_eq!(&store.load_private().unwrap().public_key(), first.public_key());
    }

    #[test]
    fn test_default_key_size() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::client(dir.path());

        let pair = store.ensure_keys().unwrap();
        assert!(format!("{:?}", pair.public_key()).contains("bits: 2048"));
    }

    #[test]
    fn test_file_names() {
        let store = KeyStore::client("/keys");
        assert_eq!(store.private_path(), PathBuf::from("/keys/client_private_key.pem"));
        assert_eq!(store.public_path(), PathBuf::from("/keys/client_public_key.pem"));
    }

    #[test]
    fn test_missing_public_half_rederived() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::client(dir.path());

        let pair = store.ensure_keys_with_bits(1024).unwrap();
        fs::remove_file(store.public_path()).unwrap();

        let reloaded = store.ensure_keys_with_bits(1024).unwrap();
        assert_eq!(reloaded.public_key(), pair.public_key());
        assert_eq!(&store.load_public().unwrap(), pair.public_key());
    }

    #[test]
    fn test_creates_key_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = KeyStore::client(&nested);

        store.ensure_keys_with_bits(1024).unwrap();
        assert!(store.private_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_private_key_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::client(dir.path());
        store.ensure_keys_with_bits(1024).unwrap();

        let mode = fs::metadata(store.private_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_public_key_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server_public_key.pem");
        let pair = KeyPair::generate_with_bits(1024).unwrap();

        write_public_key(&path, pair.public_key()).unwrap();
        assert_eq!(&read_public_key(&path).unwrap(), pair.public_key());
    }
}
