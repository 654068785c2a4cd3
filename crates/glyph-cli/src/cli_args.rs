//! CLI argument definitions for the Glyph command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined here,
//! keeping `main.rs` focused on dispatch logic.

use clap::{Parser, Subcommand};

/// Glyph - documents composed by extension processes
#[derive(Parser)]
#[command(name = "glyph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Log every extension exchange to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Resolve a document and print the result
    Resolve {
        /// Path to the document (markup, or a JSON content tree with --tree)
        #[arg(short, long)]
        input: String,

        /// Read the input as a JSON array of content nodes instead of markup
        #[arg(long)]
        tree: bool,

        /// Output format passed to extensions (html, latex, text, ...)
        #[arg(short, long, default_value = "html")]
        format: String,

        /// Define an extension as NAME=COMMAND (run through the shell)
        #[arg(short, long = "define", value_name = "NAME=COMMAND")]
        defines: Vec<String>,

        /// Document metadata as KEY=VALUE
        #[arg(short, long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,

        /// Path to a JSON host config file
        #[arg(short, long)]
        config: Option<String>,

        /// Per-invocation timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Maximum nesting of extension calls
        #[arg(long)]
        max_depth: Option<usize>,

        /// Maximum number of extension processes running at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Run an extension's info exchange and print its descriptor
    Info {
        /// Shell command that starts the extension
        #[arg(long)]
        command: String,

        /// Output format to ask about
        #[arg(short, long, default_value = "html")]
        format: String,

        /// Timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },
}
