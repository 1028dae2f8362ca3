// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voxa - a multi-tenant conversational-character backend.
//!
//! This is the binary entry point. Exit codes: 0 on success, 1 on
//! failure, 400 when argument parsing fails.

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap::error::ErrorKind;

/// Sentinel exit code for argument-parse errors.
const EXIT_USAGE: i32 = 400;

/// Voxa - a multi-tenant conversational-character backend.
#[derive(Parser, Debug)]
#[command(name = "voxa", version, about, long_about = None)]
struct Cli {
    /// Path to a voxa.toml; the XDG hierarchy is searched when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Voxa backend server.
    Serve,
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_USAGE);
        }
    };

    let config = match cli.config {
        Some(path) => voxa_config::load_config_from_path(&path),
        None => voxa_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("voxa: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.server.log_level);

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run(config).await {
                tracing::error!(error = %e, "server failed");
                std::process::exit(1);
            }
        }
        None => {
            println!("voxa: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve() {
        let cli = Cli::try_parse_from(["voxa", "serve"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert!(cli.config.is_none());
    }

    #[test]
    fn cli_accepts_a_config_path() {
        let cli = Cli::try_parse_from(["voxa", "--config", "/etc/voxa/voxa.toml", "serve"]).unwrap();
        assert_eq!(cli.config.unwrap(), PathBuf::from("/etc/voxa/voxa.toml"));
    }

    #[test]
    fn unknown_arguments_fail_to_parse() {
        assert!(Cli::try_parse_from(["voxa", "--bogus"]).is_err());
    }
}
