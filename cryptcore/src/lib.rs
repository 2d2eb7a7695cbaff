#![forbid(unsafe_code)]
//! Local cryptographic engine for the decipher shell
//!
//! Symmetric file encryption, RSA key pairs and RSA key wrapping, all done
//! in-process. The [`ops::Workspace`] type ties the engines to key files on
//! disk; the engines themselves only transform bytes.

pub mod asymmetric;
pub mod error;
pub mod ops;
pub mod store;
pub mod symmetric;

pub use asymmetric::{generate_keypair, unwrap_key, wrap_key, KeySize, RsaKeyPair};
pub use error::{CryptoError, Result};
pub use ops::{KeyLayout, Workspace};
pub use store::Overwrite;
pub use symmetric::{decrypt, encrypt, EncryptedBlob, SymmetricKey};
