//! Info command implementation
//!
//! Runs one extension's `info` exchange and prints its descriptor.

use anyhow::{Context, Result};
use colored::Colorize;
use glyph_host::{
    CancelSignal, DescriptorError, ExtensionDescriptor, ExtensionRegistry, HostConfig, LaunchSpec,
    ProcessInvoker,
};
use serde::Serialize;
use std::process::ExitCode;
use std::time::Duration;

use super::reporting;

/// Registry name the probed extension is defined under.
const PROBE_NAME: &str = "extension";

#[derive(Serialize)]
struct InfoOutput<'a> {
    success: bool,
    format: &'a str,
    supports_format: bool,
    descriptor: &'a ExtensionDescriptor,
    warnings: Vec<String>,
}

/// Run the info command
///
/// # Arguments
/// * `command` - Shell command that starts the extension
/// * `format` - Output format to check support for
/// * `timeout_ms` - Optional timeout override
/// * `json_output` - Whether to output machine-readable JSON
///
/// # Returns
/// Exit code: 0 if the extension described itself and supports `format`,
/// 1 otherwise
pub async fn run(
    command: &str,
    format: &str,
    timeout_ms: Option<u64>,
    json_output: bool,
    cancel: CancelSignal,
) -> Result<ExitCode> {
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| HostConfig::default().timeout());

    let mut registry = ExtensionRegistry::new();
    registry
        .define(LaunchSpec::shell(PROBE_NAME, command))
        .with_context(|| format!("Invalid extension command '{}'", command))?;
    let invoker = ProcessInvoker::new(1, cancel);

    let (descriptor, supports_format) = match registry
        .describe(PROBE_NAME, format, &invoker, timeout)
        .await
    {
        Ok(descriptor) => (descriptor, true),
        // The exchange itself succeeded; the descriptor is still worth showing.
        Err(DescriptorError::UnsupportedFormat { .. }) => (
            registry
                .cached_descriptor(PROBE_NAME)
                .context("descriptor missing after a successful info exchange")?,
            false,
        ),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to describe '{}'", command));
        }
    };
    let warnings = registry.take_notices();

    if json_output {
        let output = InfoOutput {
            success: supports_format,
            format,
            supports_format,
            descriptor: &descriptor,
            warnings,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        reporting::print_descriptor(&descriptor, &warnings);
        if !supports_format {
            eprintln!(
                "{} '{}' does not support the {} format",
                "x".red(),
                descriptor.name,
                format
            );
        }
    }

    if supports_format {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}
