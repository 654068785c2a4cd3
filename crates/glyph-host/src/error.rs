//! Error types for extension invocation and content resolution.
//!
//! Everything except [`ResolveError`] is local to one call-site: the resolver
//! records it and substitutes an error marker instead of failing the document.

use glyph_protocol::ProtocolError;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single extension process exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// The process could not be started.
    #[error("failed to spawn extension: {0}")]
    Spawn(String),
    /// The process did not finish in time and was killed.
    #[error("extension timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },
    /// The process exited unsuccessfully. `output` holds what it printed.
    #[error("extension exited with {}: {output}", exit_description(.code))]
    Failed { code: Option<i32>, output: String },
    /// Reading from or writing to the process failed.
    #[error("i/o error while talking to extension: {0}")]
    Io(String),
    /// The resolution was cancelled while the process was running.
    #[error("invocation was cancelled")]
    Cancelled,
}

/// Failure to obtain a usable descriptor through an `info` exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("no extension named '{0}' has been defined")]
    UnknownExtension(String),
    #[error("info exchange failed: {0}")]
    Invocation(InvokeError),
    #[error("invalid info response: {0}")]
    Protocol(ProtocolError),
    /// The extension listed errors in its `info` response.
    #[error("the extension reported: {}", .0.join("; "))]
    Reported(Vec<String>),
    #[error("output format '{format}' is not supported (supported: {})", .supported.join(", "))]
    UnsupportedFormat {
        format: String,
        supported: Vec<String>,
    },
    /// The exchange was interrupted by cancellation. Never cached.
    #[error("info exchange was cancelled")]
    Cancelled,
}

/// Errors raised while defining or looking up extensions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid extension name '{0}'")]
    InvalidName(String),
    #[error("'{0}' is reserved for the identity extension")]
    Reserved(String),
    #[error("extension '{0}' has no launch command")]
    EmptyCommand(String),
    #[error("extension '{0}' is already defined")]
    AlreadyDefined(String),
    #[error("no extension named '{0}' has been defined")]
    UnknownExtension(String),
}

/// Why a single call-site could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallSiteError {
    #[error("no extension named '{0}' has been defined")]
    UnknownExtension(String),
    #[error("{0}")]
    Descriptor(DescriptorError),
    #[error(
        "timeout after {}ms. If the extension needs more time, set the \"timeout\" metadata field",
        .timeout.as_millis()
    )]
    InvocationTimeout { timeout: Duration },
    #[error("extension exited with {}: {output}", exit_description(.code))]
    InvocationFailed { code: Option<i32>, output: String },
    #[error("failed to start the extension: {0}")]
    SpawnFailed(String),
    #[error("i/o error while talking to the extension: {0}")]
    Io(String),
    #[error("the extension call was cancelled")]
    Cancelled,
    #[error("{0}")]
    Protocol(ProtocolError),
    #[error("the extension does not support {} calls", variant_name(.block))]
    UnsupportedVariant { block: bool },
    #[error("the identity extension expects raw text as its first argument")]
    IdentityArgument,
    #[error("failed to parse markup: {0}")]
    Markup(String),
    #[error("more than {limit} nested extension calls")]
    RecursionLimitExceeded { limit: usize },
}

/// Fatal outcome of a whole resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("document resolution was cancelled")]
    Cancelled,
}

fn variant_name(block: &bool) -> &'static str {
    if *block {
        "block"
    } else {
        "inline"
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by a signal)".to_string(),
    }
}

impl From<InvokeError> for CallSiteError {
    fn from(error: InvokeError) -> Self {
        match error {
            InvokeError::Spawn(message) => CallSiteError::SpawnFailed(message),
            InvokeError::Timeout { timeout } => CallSiteError::InvocationTimeout { timeout },
            InvokeError::Failed { code, output } => CallSiteError::InvocationFailed { code, output },
            InvokeError::Io(message) => CallSiteError::Io(message),
            InvokeError::Cancelled => CallSiteError::Cancelled,
        }
    }
}

impl From<ProtocolError> for CallSiteError {
    fn from(error: ProtocolError) -> Self {
        CallSiteError::Protocol(error)
    }
}

/// Process-level failures of the `info` exchange surface as the same
/// errors an action exchange would produce.
impl From<DescriptorError> for CallSiteError {
    fn from(error: DescriptorError) -> Self {
        match error {
            DescriptorError::UnknownExtension(name) => CallSiteError::UnknownExtension(name),
            DescriptorError::Invocation(error) => error.into(),
            DescriptorError::Cancelled => CallSiteError::Cancelled,
            other => CallSiteError::Descriptor(other),
        }
    }
}
