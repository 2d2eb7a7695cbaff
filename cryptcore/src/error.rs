//! Error taxonomy shared by every engine and operation

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shown for every failure to open a sealed file or a wrapped key.
const DECRYPT_FAILED: &str = "decryption failed: wrong key, wrong passphrase, or corrupted data";

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Truncated or otherwise unparseable input
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Tag mismatch. Rendered exactly like [`CryptoError::Decryption`].
    #[error("{}", DECRYPT_FAILED)]
    AuthenticationFailure,

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("payload of {len} bytes exceeds the {max}-byte limit of this RSA key")]
    PayloadTooLarge { len: usize, max: usize },

    /// Padding failure, wrong passphrase or unreadable private key; never says which.
    #[error("{}", DECRYPT_FAILED)]
    Decryption,

    #[error("refusing to overwrite existing file: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CryptoError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        CryptoError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for the failures a caller must present as a single "could not decrypt".
    pub fn is_decrypt_failure(&self) -> bool {
        matches!(
            self,
            CryptoError::AuthenticationFailure
                | CryptoError::Decryption
                | CryptoError::MalformedInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;
