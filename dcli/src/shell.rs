//! Command dispatch for the interactive shell

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use cryptcore::{CryptoError, Workspace};
use zeroize::Zeroizing;

use crate::command::{self, Command};

pub const BANNER: &str = r"
    ██████╗ ███████╗ ██████╗██╗██████╗ ██╗  ██╗███████╗██████╗
    ██╔══██╗██╔════╝██╔════╝██║██╔══██╗██║  ██║██╔════╝██╔══██╗
    ██║  ██║█████╗  ██║     ██║██████╔╝███████║█████╗  ██████╔╝
    ██║  ██║██╔══╝  ██║     ██║██╔═══╝ ██╔══██║██╔══╝  ██╔══██╗
    ██████╔╝███████╗╚██████╗██║██║     ██║  ██║███████╗██║  ██║
    ╚═════╝ ╚══════╝ ╚═════╝╚═╝╚═╝     ╚═╝  ╚═╝╚══════╝╚═╝  ╚═╝
                         A Secure File Encryption & Decryption Tool
";

pub const HELP: &str = "Commands:
  - generate secret key
  - encrypt file <path/to/file>
  - generate rsa keys
  - encrypt secret key with <path/to/public_key>
  - decrypt secret key <encrypted_secret_key_path> with <private_key_path>
  - decrypt file <encrypted_file_path> with <decrypted_key_path>
  - help
  - exit
";

/// Source of interactive answers; swapped out in tests
pub trait Prompt {
    fn line(&mut self, message: &str) -> io::Result<String>;
    fn secret(&mut self, message: &str) -> io::Result<Zeroizing<String>>;
}

/// Reads answers from stdin, passphrases from the terminal without echo
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn line(&mut self, message: &str) -> io::Result<String> {
        print!("{message}");
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }

    fn secret(&mut self, message: &str) -> io::Result<Zeroizing<String>> {
        rpassword::prompt_password(message).map(Zeroizing::new)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Exit,
}

pub struct Shell<P> {
    workspace: Workspace,
    prompt: P,
}

impl<P: Prompt> Shell<P> {
    pub fn new(workspace: Workspace, prompt: P) -> Self {
        Self { workspace, prompt }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Run one command. Errors are meant to be shown to the user, not to end the shell.
    pub fn execute(&mut self, command: &Command) -> Result<Outcome> {
        let ws = &self.workspace;
        match command {
            Command::Empty => {}
            Command::Exit => {
                println!("👋 Goodbye.");
                return Ok(Outcome::Exit);
            }
            Command::Help => print!("{HELP}"),
            Command::GenerateSecretKey => {
                let path = ws.generate_secret_key().map_err(explain)?;
                success(&format!("Secret key generated and saved as {}", path.display()));
            }
            Command::EncryptFile { path } => {
                let key = ws.layout().secret_key_path();
                let out = ws.encrypt_file(path, &key).map_err(|err| match err {
                    CryptoError::FileNotFound(ref missing) if missing == &key => anyhow!(
                        "{} not found. Run 'generate secret key' first.",
                        key.display()
                    ),
                    other => explain(other),
                })?;
                success(&format!("Encrypted {} → {}", path.display(), out.display()));
            }
            Command::DecryptFile { path, key } => {
                let out = ws.decrypt_file(path, key).map_err(|err| {
                    if err.is_decrypt_failure() {
                        anyhow!("Failed to decrypt file. Check your paths or key.")
                    } else {
                        explain(err)
                    }
                })?;
                success(&format!("Decrypted {} → {}", path.display(), out.display()));
            }
            Command::GenerateRsaKeys => self.generate_rsa_keys()?,
            Command::WrapSecretKey { public_key } => {
                let secret = ws.layout().secret_key_path();
                let out = ws.wrap_secret_key(public_key).map_err(|err| match err {
                    CryptoError::FileNotFound(ref missing) if missing == &secret => anyhow!(
                        "{} not found. Run 'generate secret key' first.",
                        secret.display()
                    ),
                    other => explain(other),
                })?;
                success(&format!("Secret key encrypted → {}", out.display()));
            }
            Command::UnwrapSecretKey {
                wrapped,
                private_key,
            } => self.unwrap_secret_key(wrapped, private_key)?,
        }
        Ok(Outcome::Continue)
    }

    /// Parse and run one input line, reporting any failure.
    ///
    /// `None` means the command failed; the caller keeps reading either way.
    pub fn run_line(&mut self, line: &str) -> Option<Outcome> {
        let command = match command::parse(line) {
            Ok(command) => command,
            Err(err) => {
                report(&anyhow::Error::new(err));
                return None;
            }
        };
        match self.execute(&command) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                report(&err);
                None
            }
        }
    }

    fn generate_rsa_keys(&mut self) -> Result<()> {
        let owner = self
            .prompt
            .line("Enter your name (for public key naming): ")
            .context("reading name")?;
        println!(
            "🔑 Generating {}-bit RSA keys...",
            self.workspace.key_size().bits()
        );
        let passphrase = self
            .prompt
            .secret("Enter passphrase for the private key (leave empty for none): ")
            .context("reading passphrase")?;
        if !passphrase.is_empty() {
            let confirm = self
                .prompt
                .secret("Verifying - Enter passphrase: ")
                .context("reading passphrase")?;
            if *confirm != *passphrase {
                bail!("Passphrases do not match. No keys were written.");
            }
        }

        let (private, public) = self
            .workspace
            .generate_rsa_keypair(&owner, Some(passphrase.as_str()))
            .map_err(|err| match err {
                CryptoError::KeyGeneration(_) => {
                    anyhow!("Failed to generate RSA keys: {err}")
                }
                other => explain(other),
            })?;
        success(&format!(
            "RSA keys generated!\nPrivate: {}\nPublic: {}",
            private.display(),
            public.display()
        ));
        Ok(())
    }

    fn unwrap_secret_key(&mut self, wrapped: &Path, private_key: &Path) -> Result<()> {
        // catch a mistyped path before asking for a passphrase
        if !wrapped.exists() {
            return Err(explain(CryptoError::FileNotFound(wrapped.to_path_buf())));
        }
        let needs_passphrase = self
            .workspace
            .private_key_needs_passphrase(private_key)
            .map_err(explain)?;
        let passphrase = if needs_passphrase {
            Some(
                self.prompt
                    .secret(&format!("Enter pass phrase for {}: ", private_key.display()))
                    .context("reading passphrase")?,
            )
        } else {
            None
        };

        let out = self
            .workspace
            .unwrap_secret_key(wrapped, private_key, passphrase.as_deref().map(String::as_str))
            .map_err(|err| {
                if err.is_decrypt_failure() {
                    anyhow!("Failed to decrypt secret key. Check your files and paths.")
                } else {
                    explain(err)
                }
            })?;
        success(&format!("Secret key decrypted → {}", out.display()));
        Ok(())
    }
}

/// Turn engine errors into messages for the shell user
fn explain(err: CryptoError) -> anyhow::Error {
    match err {
        CryptoError::FileNotFound(path) => anyhow!("File not found: {}", path.display()),
        CryptoError::OutputExists(path) => anyhow!(
            "{} already exists. Remove it or restart with --overwrite.",
            path.display()
        ),
        other => anyhow::Error::new(other),
    }
}

fn success(message: &str) {
    println!("{} {}", "✅".green(), message.green());
}

/// Print an error the way the shell reports failed commands
pub fn report(err: &anyhow::Error) {
    eprintln!("{} {}", "❌".red(), format!("{err:#}").red());
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptcore::{KeyLayout, Overwrite};
    use std::collections::VecDeque;
    use std::fs;

    #[derive(Default)]
    struct Scripted {
        answers: VecDeque<String>,
    }

    impl Scripted {
        fn with(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
            }
        }

        fn next(&mut self) -> io::Result<String> {
            self.answers
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
        }
    }

    impl Prompt for Scripted {
        fn line(&mut self, _message: &str) -> io::Result<String> {
            self.next()
        }

        fn secret(&mut self, _message: &str) -> io::Result<Zeroizing<String>> {
            self.next().map(Zeroizing::new)
        }
    }

    fn shell(dir: &Path, answers: &[&str]) -> Shell<Scripted> {
        Shell::new(
            Workspace::new(KeyLayout::in_dir(dir)),
            Scripted::with(answers),
        )
    }

    #[test]
    fn exit_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path(), &[]);
        assert_eq!(sh.execute(&Command::Empty).unwrap(), Outcome::Continue);
        assert_eq!(sh.execute(&Command::Help).unwrap(), Outcome::Continue);
        assert_eq!(sh.execute(&Command::Exit).unwrap(), Outcome::Exit);
    }

    #[test]
    fn encrypt_then_decrypt_through_shell() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path(), &[]);
        let input = dir.path().join("plan.txt");
        fs::write(&input, b"the plan").unwrap();

        sh.execute(&Command::GenerateSecretKey).unwrap();
        sh.execute(&Command::EncryptFile { path: input.clone() }).unwrap();
        fs::remove_file(&input).unwrap();
        sh.execute(&Command::DecryptFile {
            path: dir.path().join("plan.txt.enc"),
            key: dir.path().join("secret.key"),
        })
        .unwrap();
        assert_eq!(fs::read(&input).unwrap(), b"the plan");
    }

    #[test]
    fn encrypt_without_secret_key_hints_at_generation() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path(), &[]);
        let input = dir.path().join("plan.txt");
        fs::write(&input, b"x").unwrap();
        let err = sh.execute(&Command::EncryptFile { path: input }).unwrap_err();
        assert!(err.to_string().contains("Run 'generate secret key' first"), "{err}");
    }

    #[test]
    fn decrypt_failures_get_one_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path(), &[]);
        sh.execute(&Command::GenerateSecretKey).unwrap();
        let bogus = dir.path().join("bogus.enc");
        fs::write(&bogus, [0u8; 64]).unwrap();
        let short = dir.path().join("short.enc");
        fs::write(&short, [0u8; 3]).unwrap();

        let key = dir.path().join("secret.key");
        let tampered = sh
            .execute(&Command::DecryptFile { path: bogus, key: key.clone() })
            .unwrap_err();
        let truncated = sh
            .execute(&Command::DecryptFile { path: short, key })
            .unwrap_err();
        assert_eq!(tampered.to_string(), truncated.to_string());
        assert_eq!(
            tampered.to_string(),
            "Failed to decrypt file. Check your paths or key."
        );
    }

    #[test]
    fn existing_output_suggests_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path(), &[]);
        sh.execute(&Command::GenerateSecretKey).unwrap();
        let err = sh.execute(&Command::GenerateSecretKey).unwrap_err();
        assert!(err.to_string().contains("--overwrite"), "{err}");
    }

    #[test]
    fn rsa_flow_with_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path(), &["alice", "x", "x", "x"]);
        sh.execute(&Command::GenerateRsaKeys).unwrap();
        sh.execute(&Command::GenerateSecretKey).unwrap();
        sh.execute(&Command::WrapSecretKey {
            public_key: dir.path().join("alice_public_key.pem"),
        })
        .unwrap();
        sh.execute(&Command::UnwrapSecretKey {
            wrapped: dir.path().join("encrypted_secret.key"),
            private_key: dir.path().join("private-key.pem"),
        })
        .unwrap();
        assert_eq!(
            fs::read(dir.path().join("secret.key")).unwrap(),
            fs::read(dir.path().join("decrypted_secret.key")).unwrap()
        );
    }

    #[test]
    fn mismatched_passphrases_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path(), &["alice", "one", "two"]);
        let err = sh.execute(&Command::GenerateRsaKeys).unwrap_err();
        assert!(err.to_string().contains("do not match"), "{err}");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn run_line_reports_failures_and_keeps_going() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path(), &[]);
        let missing = dir.path().join("missing.txt");

        assert_eq!(sh.run_line("help"), Some(Outcome::Continue));
        assert_eq!(sh.run_line(""), Some(Outcome::Continue));
        assert_eq!(sh.run_line("make coffee"), None);
        assert_eq!(sh.run_line("encrypt file"), None);
        assert_eq!(sh.run_line(&format!("encrypt file {}", missing.display())), None);
        assert_eq!(sh.run_line("generate secret key"), Some(Outcome::Continue));
        assert!(dir.path().join("secret.key").exists());
        assert_eq!(sh.run_line("EXIT"), Some(Outcome::Exit));
    }

    #[test]
    fn missing_wrapped_key_is_reported_before_prompting() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path(), &["eve", "pw", "pw"]);
        sh.execute(&Command::GenerateRsaKeys).unwrap();

        // the script is spent, so a passphrase prompt would fail differently
        let err = sh
            .execute(&Command::UnwrapSecretKey {
                wrapped: dir.path().join("typo_secret.key"),
                private_key: dir.path().join("private-key.pem"),
            })
            .unwrap_err();
        assert!(err.to_string().starts_with("File not found"), "{err:#}");
        assert!(err.to_string().contains("typo_secret.key"), "{err:#}");
    }

    #[test]
    fn wrong_passphrase_on_unwrap() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = Shell::new(
            Workspace::new(KeyLayout::in_dir(dir.path())).with_overwrite(Overwrite::Replace),
            Scripted::with(&["bob", "right", "right", "wrong"]),
        );
        sh.execute(&Command::GenerateRsaKeys).unwrap();
        sh.execute(&Command::GenerateSecretKey).unwrap();
        sh.execute(&Command::WrapSecretKey {
            public_key: dir.path().join("bob_public_key.pem"),
        })
        .unwrap();
        let err = sh
            .execute(&Command::UnwrapSecretKey {
                wrapped: dir.path().join("encrypted_secret.key"),
                private_key: dir.path().join("private-key.pem"),
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to decrypt secret key. Check your files and paths."
        );
        assert!(!dir.path().join("decrypted_secret.key").exists());
    }
}
