//! decipher shell library
//!
//! Command-line configuration, the command grammar and the dispatcher. The
//! binary in `main.rs` only wires these to stdin and the terminal.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use cryptcore::{KeyLayout, KeySize, Overwrite, Workspace};

pub mod command;
pub mod shell;

/// Interactive file encryption and RSA key-wrapping shell
#[derive(Parser, Debug)]
#[command(name = "decipher", version)]
pub struct Args {
    /// Directory holding secret.key, private-key.pem and the other default files
    #[arg(short, long, env = "DECIPHER_DIR", default_value = ".", value_name = "DIR")]
    pub dir: PathBuf,

    /// Overwrite existing output files instead of refusing
    #[arg(short, long)]
    pub overwrite: bool,

    /// RSA modulus size for `generate rsa keys` (2048, 3072 or 4096)
    #[arg(long, default_value_t = KeySize::Rsa2048, value_name = "BITS")]
    pub rsa_bits: KeySize,

    /// Secret key used by `encrypt file` and `encrypt secret key`
    #[arg(long, env = "DECIPHER_SECRET_KEY", value_name = "FILE")]
    pub secret_key: Option<PathBuf>,

    /// Run a single shell command and exit
    #[arg(short, long, value_name = "COMMAND")]
    pub command: Option<String>,

    /// Skip the banner and command list
    #[arg(long)]
    pub no_banner: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn workspace(&self) -> Workspace {
        let mut layout = KeyLayout::in_dir(&self.dir);
        if let Some(secret_key) = &self.secret_key {
            layout.secret_key = secret_key.clone();
        }
        let overwrite = if self.overwrite {
            Overwrite::Replace
        } else {
            Overwrite::Refuse
        };
        Workspace::new(layout)
            .with_overwrite(overwrite)
            .with_key_size(self.rsa_bits)
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn default_log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
