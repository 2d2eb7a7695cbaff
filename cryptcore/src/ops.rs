//! The six file-level operations behind the shell commands
//!
//! Each operation loads its inputs, transforms them in memory and only then
//! writes its output through [`store::save`], so a failure never leaves a
//! partial or corrupted output file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::asymmetric::{self, KeySize};
use crate::error::{CryptoError, Result};
use crate::store::{self, Overwrite};
use crate::symmetric::{self, SymmetricKey};

const ENCRYPTED_EXT: &str = ".enc";
const DECRYPTED_EXT: &str = ".denc";

/// File names used when a command does not name a file explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    /// Directory the names below are resolved against
    pub dir: PathBuf,
    pub secret_key: PathBuf,
    pub private_key: PathBuf,
    /// Appended to the owner's name, e.g. `alice_public_key.pem`
    pub public_key_suffix: String,
    pub wrapped_key: PathBuf,
    pub unwrapped_key: PathBuf,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            secret_key: PathBuf::from("secret.key"),
            private_key: PathBuf::from("private-key.pem"),
            public_key_suffix: "_public_key.pem".to_string(),
            wrapped_key: PathBuf::from("encrypted_secret.key"),
            unwrapped_key: PathBuf::from("decrypted_secret.key"),
        }
    }
}

impl KeyLayout {
    /// Default file names inside `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn secret_key_path(&self) -> PathBuf {
        self.dir.join(&self.secret_key)
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(&self.private_key)
    }

    pub fn public_key_path(&self, owner: &str) -> PathBuf {
        self.dir.join(format!("{owner}{}", self.public_key_suffix))
    }

    pub fn wrapped_key_path(&self) -> PathBuf {
        self.dir.join(&self.wrapped_key)
    }

    pub fn unwrapped_key_path(&self) -> PathBuf {
        self.dir.join(&self.unwrapped_key)
    }
}

/// `report.pdf` → `report.pdf.enc`
pub fn encrypted_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(ENCRYPTED_EXT);
    PathBuf::from(name)
}

/// `report.pdf.enc` → `report.pdf`; anything else gets `.denc` appended
pub fn decrypted_path(path: &Path) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_suffix(ENCRYPTED_EXT)) {
        Some(stem) if !stem.is_empty() && !stem.ends_with(&['/', '\\'][..]) => PathBuf::from(stem),
        _ => {
            let mut name = OsString::from(path.as_os_str());
            name.push(DECRYPTED_EXT);
            PathBuf::from(name)
        }
    }
}

/// Configuration shared by all operations
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    layout: KeyLayout,
    overwrite: Overwrite,
    key_size: KeySize,
}

impl Workspace {
    pub fn new(layout: KeyLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub fn with_overwrite(mut self, overwrite: Overwrite) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_key_size(mut self, key_size: KeySize) -> Self {
        self.key_size = key_size;
        self
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn key_size(&self) -> KeySize {
        self.key_size
    }

    /// Create a fresh secret key file
    pub fn generate_secret_key(&self) -> Result<PathBuf> {
        let path = self.layout.secret_key_path();
        let key = SymmetricKey::generate()?;
        store::save(&path, key.as_bytes(), self.overwrite)?;
        info!(path = %path.display(), "generated secret key");
        Ok(path)
    }

    /// Encrypt `path` under the key in `key_path`, writing `<path>.enc`
    pub fn encrypt_file(&self, path: &Path, key_path: &Path) -> Result<PathBuf> {
        let plaintext = store::load(path)?;
        let key = store::load_key(key_path)?;
        let sealed = symmetric::encrypt(&plaintext, &key)?;

        let out = encrypted_path(path);
        store::save(&out, &sealed, self.overwrite)?;
        info!(input = %path.display(), output = %out.display(), len = plaintext.len(), "encrypted file");
        Ok(out)
    }

    /// Decrypt a file written by [`Workspace::encrypt_file`]
    pub fn decrypt_file(&self, path: &Path, key_path: &Path) -> Result<PathBuf> {
        let sealed = store::load(path)?;
        let key = store::load_key(key_path)?;
        let plaintext = symmetric::decrypt(&sealed, &key)?;

        let out = decrypted_path(path);
        store::save(&out, &plaintext, self.overwrite)?;
        info!(input = %path.display(), output = %out.display(), len = plaintext.len(), "decrypted file");
        Ok(out)
    }

    /// Generate an RSA key pair, returning `(private, public)` key paths
    pub fn generate_rsa_keypair(
        &self,
        owner: &str,
        passphrase: Option<&str>,
    ) -> Result<(PathBuf, PathBuf)> {
        validate_owner(owner)?;
        let private_path = self.layout.private_key_path();
        let public_path = self.layout.public_key_path(owner);
        if self.overwrite == Overwrite::Refuse {
            for path in [&private_path, &public_path] {
                if path.exists() {
                    return Err(CryptoError::OutputExists(path.clone()));
                }
            }
        }

        let pair = asymmetric::generate_keypair(self.key_size, passphrase)?;
        let private = store::stage(&private_path, pair.private_pem().as_bytes(), self.overwrite)?;
        let public = store::stage(&public_path, pair.public_pem().as_bytes(), self.overwrite)?;

        // the private key goes last so a failed commit never costs an existing one
        public.commit()?;
        if let Err(err) = private.commit() {
            if self.overwrite == Overwrite::Refuse {
                if let Err(cleanup) = std::fs::remove_file(&public_path) {
                    warn!(path = %public_path.display(), error = %cleanup, "could not remove orphaned public key");
                }
            }
            return Err(err);
        }

        info!(
            private = %private_path.display(),
            public = %public_path.display(),
            encrypted = pair.is_encrypted(),
            "generated RSA key pair"
        );
        Ok((private_path, public_path))
    }

    /// Wrap the secret key file under the RSA public key at `public_key`
    pub fn wrap_secret_key(&self, public_key: &Path) -> Result<PathBuf> {
        let key = store::load_key(&self.layout.secret_key_path())?;
        let pem = store::load_pem(public_key)?;
        let public = asymmetric::parse_public_key(&pem)?;
        let wrapped = asymmetric::wrap_key(key.as_bytes(), &public)?;

        let out = self.layout.wrapped_key_path();
        store::save(&out, &wrapped, self.overwrite)?;
        info!(public_key = %public_key.display(), output = %out.display(), "wrapped secret key");
        Ok(out)
    }

    /// Recover a wrapped secret key with the RSA private key at `private_key`
    pub fn unwrap_secret_key(
        &self,
        wrapped: &Path,
        private_key: &Path,
        passphrase: Option<&str>,
    ) -> Result<PathBuf> {
        let ciphertext = store::load(wrapped)?;
        let pem = store::load_pem(private_key)?;
        let secret = asymmetric::unwrap_key(&ciphertext, &pem, passphrase)?;

        let out = self.layout.unwrapped_key_path();
        store::save(&out, &secret, self.overwrite)?;
        info!(wrapped = %wrapped.display(), output = %out.display(), "unwrapped secret key");
        Ok(out)
    }

    /// Whether the private key at `path` asks for a passphrase
    pub fn private_key_needs_passphrase(&self, path: &Path) -> Result<bool> {
        let pem = store::load_pem(path)?;
        Ok(asymmetric::is_encrypted_pem(&pem))
    }
}

/// Owner names become part of a file name and must not escape the key directory
fn validate_owner(owner: &str) -> Result<()> {
    let plain = !owner.is_empty()
        && owner != "."
        && owner != ".."
        && !owner.contains(&['/', '\\', '\0'][..]);
    if plain {
        Ok(())
    } else {
        Err(CryptoError::InvalidArgument(format!(
            "{owner:?} cannot be used to name a key file"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_classic_names() {
        let layout = KeyLayout::in_dir("keys");
        assert_eq!(layout.secret_key_path(), Path::new("keys/secret.key"));
        assert_eq!(layout.private_key_path(), Path::new("keys/private-key.pem"));
        assert_eq!(layout.public_key_path("alice"), Path::new("keys/alice_public_key.pem"));
        assert_eq!(layout.wrapped_key_path(), Path::new("keys/encrypted_secret.key"));
        assert_eq!(layout.unwrapped_key_path(), Path::new("keys/decrypted_secret.key"));
    }

    #[test]
    fn absolute_override_ignores_dir() {
        let layout = KeyLayout {
            secret_key: PathBuf::from("/etc/decipher/secret.key"),
            ..KeyLayout::in_dir("keys")
        };
        assert_eq!(layout.secret_key_path(), Path::new("/etc/decipher/secret.key"));
    }

    #[test]
    fn output_names() {
        assert_eq!(encrypted_path(Path::new("a/report.pdf")), Path::new("a/report.pdf.enc"));
        assert_eq!(decrypted_path(Path::new("a/report.pdf.enc")), Path::new("a/report.pdf"));
        assert_eq!(decrypted_path(Path::new("notes.enc.txt")), Path::new("notes.enc.txt.denc"));
        assert_eq!(decrypted_path(Path::new("blob")), Path::new("blob.denc"));
        assert_eq!(decrypted_path(Path::new(".enc")), Path::new(".enc.denc"));
        assert_eq!(decrypted_path(Path::new("dir/.enc")), Path::new("dir/.enc.denc"));
    }

    #[test]
    fn owner_names() {
        assert!(validate_owner("alice").is_ok());
        assert!(validate_owner("Bob Smith").is_ok());
        for bad in ["", ".", "..", "../x", "a/b", "a\\b"] {
            assert!(
                matches!(validate_owner(bad), Err(CryptoError::InvalidArgument(_))),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn builder_sets_options() {
        let ws = Workspace::new(KeyLayout::in_dir("k"))
            .with_overwrite(Overwrite::Replace)
            .with_key_size(KeySize::Rsa4096);
        assert_eq!(ws.key_size(), KeySize::Rsa4096);
        assert_eq!(ws.layout().dir, Path::new("k"));
        assert_eq!(ws.overwrite, Overwrite::Replace);
    }
}
