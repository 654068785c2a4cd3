//! Document loading and command-line definitions.

use anyhow::{bail, Context, Result};
use glyph_host::{ContentNode, InlineMarkup, LaunchSpec, MarkupParser};
use std::path::Path;

/// Name of the directive that defines an extension inside a document:
/// `|define, name, shell command|`.
pub const DEFINE_DIRECTIVE: &str = "define";

/// A loaded document: its content tree and the extensions it defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub tree: Vec<ContentNode>,
    pub definitions: Vec<LaunchSpec>,
}

/// Loads a document from `path`.
///
/// Markup is parsed with [`InlineMarkup`] for `format`; with `tree` the file
/// must hold a JSON array of content nodes. Top-level `define` directives
/// are removed from the tree and returned as definitions.
pub fn load_document(path: &Path, tree: bool, format: &str) -> Result<LoadedDocument> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;

    let nodes = if tree {
        serde_json::from_str::<Vec<ContentNode>>(&source)
            .with_context(|| format!("Failed to parse content tree: {}", path.display()))?
    } else {
        InlineMarkup
            .parse(&source, format)
            .with_context(|| format!("Failed to parse markup: {}", path.display()))?
    };

    extract_definitions(nodes)
}

/// Splits top-level `define` directives out of a content tree.
pub fn extract_definitions(nodes: Vec<ContentNode>) -> Result<LoadedDocument> {
    let mut tree = Vec::with_capacity(nodes.len());
    let mut definitions = Vec::new();

    for node in nodes {
        match node {
            ContentNode::ExtensionCall(call) if call.name == DEFINE_DIRECTIVE => {
                let texts: Option<Vec<&str>> =
                    call.arguments.iter().map(ContentNode::as_text).collect();
                let Some((name, command)) = texts.as_deref().and_then(|t| t.split_first()) else {
                    bail!("'{}' expects a name and a command", DEFINE_DIRECTIVE);
                };
                if command.is_empty() {
                    bail!("'{}' for '{}' has no command", DEFINE_DIRECTIVE, name);
                }
                definitions.push(LaunchSpec::shell(name.trim(), command.join(",").trim()));
            }
            other => tree.push(other),
        }
    }

    Ok(LoadedDocument { tree, definitions })
}

/// Parses a `KEY=VALUE` command-line argument.
pub fn parse_key_value(arg: &str) -> Result<(String, String)> {
    let Some((key, value)) = arg.split_once('=') else {
        bail!("expected KEY=VALUE, got '{}'", arg);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("missing key in '{}'", arg);
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Parses a `--define NAME=COMMAND` argument into a shell launch spec.
pub fn parse_definition(arg: &str) -> Result<LaunchSpec> {
    let (name, command) = parse_key_value(arg)
        .with_context(|| format!("Invalid extension definition '{}'", arg))?;
    if command.is_empty() {
        bail!("Invalid extension definition '{}': missing command", arg);
    }
    Ok(LaunchSpec::shell(name, &command))
}
