//! Key material and sealed files on disk
//!
//! Writes go to a temp file in the destination directory, are synced, and
//! then persisted over the final name in one rename, so an interrupted write
//! never leaves a truncated file behind.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::symmetric::SymmetricKey;

/// What [`save`] does when the destination already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overwrite {
    /// Fail with [`CryptoError::OutputExists`]
    #[default]
    Refuse,
    /// Atomically replace the existing file
    Replace,
}

/// Write `bytes` to `path` atomically. The file is readable by its owner only.
pub fn save(path: &Path, bytes: &[u8], overwrite: Overwrite) -> Result<()> {
    stage(path, bytes, overwrite)?.commit()
}

/// A fully written and synced temp file next to its destination
pub struct Staged {
    tmp: NamedTempFile,
    path: PathBuf,
    overwrite: Overwrite,
    len: usize,
}

/// Write `bytes` to a temp file beside `path` without touching `path` itself.
///
/// Nothing becomes visible under `path` until [`Staged::commit`]; dropping the
/// `Staged` removes the temp file.
pub fn stage(path: &Path, bytes: &[u8], overwrite: Overwrite) -> Result<Staged> {
    if overwrite == Overwrite::Refuse && path.exists() {
        return Err(CryptoError::OutputExists(path.to_path_buf()));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|err| CryptoError::io(dir, err))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|err| CryptoError::io(tmp.path(), err))?;

    Ok(Staged {
        tmp,
        path: path.to_path_buf(),
        overwrite,
        len: bytes.len(),
    })
}

impl Staged {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the temp file over the destination in one rename
    pub fn commit(self) -> Result<()> {
        let Staged {
            tmp,
            path,
            overwrite,
            len,
        } = self;
        let persisted = match overwrite {
            Overwrite::Replace => tmp.persist(&path),
            // no-clobber also covers a file appearing after the check in `stage`
            Overwrite::Refuse => tmp.persist_noclobber(&path),
        };
        persisted.map_err(|err| match err.error.kind() {
            io::ErrorKind::AlreadyExists => CryptoError::OutputExists(path.clone()),
            _ => CryptoError::io(&path, err.error),
        })?;

        debug!(path = %path.display(), len, "saved");
        Ok(())
    }
}

/// Read the whole of `path`
pub fn load(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => CryptoError::FileNotFound(path.to_path_buf()),
        _ => CryptoError::io(path, err),
    })?;
    debug!(path = %path.display(), len = bytes.len(), "loaded");
    Ok(bytes)
}

/// Load a raw 32-byte secret key file
pub fn load_key(path: &Path) -> Result<SymmetricKey> {
    let bytes = Zeroizing::new(load(path)?);
    SymmetricKey::from_bytes(&bytes)
}

/// Load a PEM file. The buffer is wiped on drop since it may hold a private key.
pub fn load_pem(path: &Path) -> Result<Zeroizing<String>> {
    let bytes = load(path)?;
    String::from_utf8(bytes).map(Zeroizing::new).map_err(|err| {
        let _wiped = Zeroizing::new(err.into_bytes());
        CryptoError::MalformedInput(format!("{} is not a PEM text file", path.display()))
    })
}
