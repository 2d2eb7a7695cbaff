//! Symmetric file encryption
//!
//! Sealed data is laid out as `salt ‖ iv ‖ tag ‖ ciphertext`. Every call to
//! [`encrypt`] draws a fresh salt and IV; the salt feeds HKDF-SHA256 so each
//! blob is sealed under its own AES-256-GCM key, and the tag is checked before
//! any plaintext is released.

use std::fmt;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use hkdf::Hkdf;
use sha2::Sha256;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, Result};

/// Length of a secret key file in bytes
pub const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 16;
pub const TAG_LEN: usize = 16;
/// Bytes an encrypted file carries on top of its plaintext
pub const HEADER_LEN: usize = SALT_LEN + IV_LEN + TAG_LEN;

const HKDF_INFO: &[u8] = b"decipher/file/aes-256-gcm/v1";

/// AES-256-GCM with a 128-bit IV and a 128-bit tag
type FileCipher = AesGcm<Aes256, U16>;

/// 256-bit secret key. Zeroed on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_LEN]);

impl SymmetricKey {
    /// Draw a new key from the OS random source
    pub fn generate() -> Result<Self> {
        let mut key = SymmetricKey([0u8; KEY_LEN]);
        fill_random(&mut key.0)?;
        Ok(key)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::Encryption(format!(
                "secret key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut key = SymmetricKey([0u8; KEY_LEN]);
        key.0.copy_from_slice(bytes);
        Ok(key)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// Borrowed view over the fields of a sealed buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptedBlob<'a> {
    pub salt: &'a [u8],
    pub iv: &'a [u8],
    pub tag: &'a [u8],
    pub ciphertext: &'a [u8],
}

impl<'a> EncryptedBlob<'a> {
    /// Split a sealed buffer into its fields.
    ///
    /// Only the length is checked here; authenticity is decided by [`decrypt`].
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CryptoError::MalformedInput(format!(
                "encrypted data is {} bytes, shorter than the {HEADER_LEN}-byte header",
                bytes.len()
            )));
        }
        let (salt, rest) = bytes.split_at(SALT_LEN);
        let (iv, rest) = rest.split_at(IV_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        Ok(EncryptedBlob {
            salt,
            iv,
            tag,
            ciphertext,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(self.salt);
        out.extend_from_slice(self.iv);
        out.extend_from_slice(self.tag);
        out.extend_from_slice(self.ciphertext);
        out
    }
}

/// Seal `plaintext` under `key`, returning `salt ‖ iv ‖ tag ‖ ciphertext`
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    fill_random(&mut salt)?;
    fill_random(&mut iv)?;

    let cipher = message_cipher(key, &salt)?;
    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&iv), b"", &mut ciphertext)
        .map_err(|_| CryptoError::Encryption("AES-GCM refused the input".to_string()))?;

    debug!(len = plaintext.len(), "sealed buffer");
    Ok(EncryptedBlob {
        salt: &salt,
        iv: &iv,
        tag: tag.as_slice(),
        ciphertext: &ciphertext,
    }
    .to_bytes())
}

/// Open a buffer produced by [`encrypt`]
pub fn decrypt(blob: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
    let blob = EncryptedBlob::parse(blob)?;
    let cipher = message_cipher(key, blob.salt)?;

    // aes-gcm leaves the unauthenticated keystream output in the buffer on failure
    let mut plaintext = Zeroizing::new(blob.ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(blob.iv),
            b"",
            &mut plaintext,
            GenericArray::from_slice(blob.tag),
        )
        .map_err(|_| CryptoError::AuthenticationFailure)?;

    debug!(len = plaintext.len(), "opened buffer");
    Ok(std::mem::take(&mut *plaintext))
}

fn message_cipher(key: &SymmetricKey, salt: &[u8]) -> Result<FileCipher> {
    let hk = Hkdf::<Sha256>::new(Some(salt), key.as_bytes());
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(HKDF_INFO, &mut okm[..])
        .map_err(|_| CryptoError::Encryption("key derivation failed".to_string()))?;
    FileCipher::new_from_slice(&okm[..])
        .map_err(|_| CryptoError::Encryption("derived key has the wrong length".to_string()))
}

pub(crate) fn fill_random(dest: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(dest)
        .map_err(|err| CryptoError::Encryption(format!("random source unavailable: {err}")))
}
