use colored::Colorize;
use glyph_host::{ExtensionDescriptor, ResolvedDocument};

/// Prints the resolved document to stdout: top, body, then bottom.
pub(crate) fn print_document(document: &ResolvedDocument) {
    for part in [document.top(), document.text(), document.bottom()] {
        if !part.is_empty() {
            println!("{}", part);
        }
    }
}

/// Prints errors, warnings and imports to stderr, followed by a summary line.
pub(crate) fn print_diagnostics(document: &ResolvedDocument, duration_ms: u64) {
    for error in &document.errors {
        eprintln!("  {} {}", "x".red(), error);
    }
    for warning in &document.warnings {
        eprintln!("  {} {}", "!".yellow(), warning);
    }
    if !document.imports.is_empty() {
        eprintln!("{} {}", "Imports:".dimmed(), document.imports.join(", "));
    }

    let summary = format!(
        "{} fragment(s), {} error(s), {} warning(s) in {}ms",
        document.fragments.len(),
        document.errors.len(),
        document.warnings.len(),
        duration_ms
    );
    if document.has_errors() {
        eprintln!("{} {}", "Resolved with errors:".yellow().bold(), summary);
    } else {
        eprintln!("{} {}", "Resolved:".green().bold(), summary);
    }
}

pub(crate) fn print_descriptor(descriptor: &ExtensionDescriptor, warnings: &[String]) {
    println!(
        "{} {} {}",
        "Extension:".cyan().bold(),
        descriptor.name,
        descriptor.version.dimmed()
    );
    if !descriptor.description.is_empty() {
        println!("  {}", descriptor.description);
    }

    let formats: Vec<&str> = descriptor
        .supported_formats
        .iter()
        .map(String::as_str)
        .collect();
    println!("  {} {}", "Formats:".dimmed(), formats.join(", "));
    println!(
        "  {} block {}, inline {}",
        "Calls:".dimmed(),
        yes_no(descriptor.block_support),
        yes_no(descriptor.inline_support)
    );
    if !descriptor.interests.is_empty() {
        println!(
            "  {} {}",
            "Interests:".dimmed(),
            descriptor.interests.join(", ")
        );
    }

    for warning in warnings {
        eprintln!("  {} {}", "!".yellow(), warning);
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
