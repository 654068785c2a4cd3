//! Logging setup for the `glyph` binary.

use tracing_subscriber::EnvFilter;

/// Installs a stderr `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise only warnings are shown, or
/// everything from the glyph crates at debug level with `verbose`.
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "warn,glyph_host=debug,glyph_cli=debug"
    } else {
        "warn"
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
