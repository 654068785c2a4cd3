//! Glyph CLI - resolve documents whose call-sites are answered by extensions
//!
//! This binary provides commands for resolving documents and probing
//! extension processes.

use clap::Parser;
use glyph_host::cancel_pair;
use std::process::ExitCode;

use glyph_cli::commands;
use glyph_cli::commands::resolve::ResolveOptions;

mod cli_args;

use cli_args::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    glyph_cli::logging::init(cli.verbose);

    // Ctrl-C kills and reaps every running extension before exiting.
    let (cancel, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = match cli.command {
        Commands::Resolve {
            input,
            tree,
            format,
            defines,
            meta,
            config,
            timeout_ms,
            max_depth,
            jobs,
            json,
        } => {
            let options = ResolveOptions {
                input,
                tree,
                format,
                defines,
                meta,
                config,
                timeout_ms,
                max_depth,
                jobs,
                json,
            };
            commands::resolve::run(&options, signal).await
        }
        Commands::Info {
            command,
            format,
            timeout_ms,
            json,
        } => commands::info::run(&command, &format, timeout_ms, json, signal).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
