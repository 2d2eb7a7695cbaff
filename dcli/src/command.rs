//! Shell command grammar
//!
//! Keywords match case-insensitively; paths keep their case and lose
//! surrounding quotes and spaces.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const ENCRYPT_FILE_USAGE: &str = "encrypt file <path/to/file>";
pub const DECRYPT_FILE_USAGE: &str = "decrypt file <encrypted_file_path> with <decrypted_key_path>";
pub const WRAP_USAGE: &str = "encrypt secret key with <path/to/public_key>";
pub const UNWRAP_USAGE: &str =
    "decrypt secret key <encrypted_secret_key_path> with <private_key_path>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GenerateSecretKey,
    EncryptFile { path: PathBuf },
    DecryptFile { path: PathBuf, key: PathBuf },
    GenerateRsaKeys,
    WrapSecretKey { public_key: PathBuf },
    UnwrapSecretKey { wrapped: PathBuf, private_key: PathBuf },
    Help,
    Exit,
    Empty,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Unknown command. Try one of the listed options.")]
    Unknown,
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        parse(line)
    }
}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }

    for (phrase, command) in [
        ("exit", Command::Exit),
        ("quit", Command::Exit),
        ("help", Command::Help),
        ("?", Command::Help),
        ("generate secret key", Command::GenerateSecretKey),
        ("generate rsa keys", Command::GenerateRsaKeys),
    ] {
        if line.eq_ignore_ascii_case(phrase) {
            return Ok(command);
        }
    }

    if let Some(rest) = keyword(line, "encrypt secret key") {
        let target = keyword(rest, "with").ok_or(ParseError::Usage(WRAP_USAGE))?;
        let public_key = path_arg(target).ok_or(ParseError::Usage(WRAP_USAGE))?;
        return Ok(Command::WrapSecretKey { public_key });
    }
    if let Some(rest) = keyword(line, "decrypt secret key") {
        let (wrapped, private_key) = split_with(rest).ok_or(ParseError::Usage(UNWRAP_USAGE))?;
        return Ok(Command::UnwrapSecretKey {
            wrapped,
            private_key,
        });
    }
    if let Some(rest) = keyword(line, "encrypt file") {
        let path = path_arg(rest).ok_or(ParseError::Usage(ENCRYPT_FILE_USAGE))?;
        return Ok(Command::EncryptFile { path });
    }
    if let Some(rest) = keyword(line, "decrypt file") {
        let (path, key) = split_with(rest).ok_or(ParseError::Usage(DECRYPT_FILE_USAGE))?;
        return Ok(Command::DecryptFile { path, key });
    }

    Err(ParseError::Unknown)
}

/// Strip a leading keyword phrase that ends at whitespace or end of input
fn keyword<'a>(line: &'a str, phrase: &str) -> Option<&'a str> {
    let head = line.get(..phrase.len())?;
    if !head.eq_ignore_ascii_case(phrase) {
        return None;
    }
    let rest = &line[phrase.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest.trim_start()),
        Some(_) => None,
    }
}

/// Split `<a> with <b>` on the first ` with `
fn split_with(rest: &str) -> Option<(PathBuf, PathBuf)> {
    const SEPARATOR: &str = " with ";
    let at = rest.to_ascii_lowercase().find(SEPARATOR)?;
    let first = path_arg(&rest[..at])?;
    let second = path_arg(&rest[at + SEPARATOR.len()..])?;
    Some((first, second))
}

fn path_arg(raw: &str) -> Option<PathBuf> {
    let cleaned = raw.trim_matches(|c: char| c == '"' || c.is_whitespace());
    (!cleaned.is_empty()).then(|| PathBuf::from(cleaned))
}
