//! Resolve command implementation
//!
//! Loads a document, defines its extensions and resolves it.

use anyhow::{Context, Result};
use colored::Colorize;
use glyph_host::{
    CancelSignal, ExtensionRegistry, HostConfig, InlineMarkup, ResolvedDocument, Resolver,
};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::reporting;
use crate::input::{load_document, parse_definition, parse_key_value};

/// Exit code for a document that resolved with call-site errors.
pub const EXIT_CALL_SITE_ERRORS: u8 = 2;

/// Options for the resolve command.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub input: String,
    pub tree: bool,
    pub format: String,
    pub defines: Vec<String>,
    pub meta: Vec<String>,
    pub config: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_depth: Option<usize>,
    pub jobs: Option<usize>,
    pub json: bool,
}

#[derive(Serialize)]
struct ResolveOutput<'a> {
    success: bool,
    format: &'a str,
    text: String,
    top: String,
    bottom: String,
    duration_ms: u64,
    #[serde(flatten)]
    document: &'a ResolvedDocument,
}

/// Run the resolve command
///
/// # Returns
/// Exit code: 0 if every call-site resolved, 2 if some were replaced by
/// error markers
pub async fn run(options: &ResolveOptions, cancel: CancelSignal) -> Result<ExitCode> {
    let start = Instant::now();
    let config = host_config(options)?;

    let document = load_document(Path::new(&options.input), options.tree, &options.format)?;

    let mut registry = ExtensionRegistry::new();
    for meta in &options.meta {
        let (key, value) = parse_key_value(meta).context("Invalid --meta argument")?;
        registry.set_metadata(key, value);
    }
    for define in &options.defines {
        let spec = parse_definition(define)?;
        registry
            .define(spec)
            .with_context(|| format!("Failed to define extension from '{}'", define))?;
    }
    for spec in document.definitions {
        let name = spec.name.clone();
        registry
            .define(spec)
            .with_context(|| format!("Failed to define extension '{}' in {}", name, options.input))?;
    }

    if !options.json {
        eprintln!("{} {}", "Resolving:".cyan().bold(), options.input);
        if !registry.is_empty() {
            eprintln!("{} {}", "Extensions:".dimmed(), registry.names().join(", "));
        }
    }

    let resolver = Resolver::new(Arc::new(registry), Arc::new(InlineMarkup), config)
        .with_cancel(cancel);
    let resolved = resolver
        .resolve_document(&document.tree, &options.format)
        .await
        .with_context(|| format!("Failed to resolve {}", options.input))?;
    let duration_ms = start.elapsed().as_millis() as u64;

    if options.json {
        let output = ResolveOutput {
            success: !resolved.has_errors(),
            format: &options.format,
            text: resolved.text(),
            top: resolved.top(),
            bottom: resolved.bottom(),
            duration_ms,
            document: &resolved,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        reporting::print_document(&resolved);
        reporting::print_diagnostics(&resolved, duration_ms);
    }

    if resolved.has_errors() {
        Ok(ExitCode::from(EXIT_CALL_SITE_ERRORS))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Builds the host config from the optional config file and flag overrides.
fn host_config(options: &ResolveOptions) -> Result<HostConfig> {
    let mut config = match &options.config {
        Some(path) => HostConfig::load(Path::new(path))?,
        None => HostConfig::default(),
    };

    if let Some(timeout_ms) = options.timeout_ms {
        config = config.with_timeout(Duration::from_millis(timeout_ms));
    }
    if let Some(max_depth) = options.max_depth {
        config = config.with_max_depth(max_depth);
    }
    if let Some(jobs) = options.jobs {
        config = config.with_max_concurrency(jobs);
    }

    config.validate()?;
    Ok(config)
}
