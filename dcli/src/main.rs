//! decipher: interactive file encryption shell
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use dcli::shell::{Outcome, Shell, TerminalPrompt, BANNER, HELP};
use dcli::Args;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut shell = Shell::new(args.workspace(), TerminalPrompt);
    debug!(layout = ?shell.workspace().layout(), "starting shell");

    // one-shot mode for scripts
    if let Some(line) = &args.command {
        return Ok(match shell.run_line(line) {
            Some(_) => ExitCode::SUCCESS,
            None => ExitCode::FAILURE,
        });
    }

    if !args.no_banner {
        println!("{BANNER}");
        println!("{HELP}");
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("decipher> ");
        io::stdout().flush()?;

        line.clear();
        let read = stdin.lock().read_line(&mut line).context("reading command")?;
        if read == 0 {
            println!();
            break;
        }
        if shell.run_line(&line) == Some(Outcome::Exit) {
            break;
        }
    }
    Ok(ExitCode::SUCCESS)
}
