//! Error types for sigauth-core.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Key file missing: {}", .0.display())]
    KeyFileMissing(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid key encoding: {0}")]
    KeyEncoding(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Random source unavailable: {0}")]
    Randomness(String),
}
