//! Encoding of requests and validating decoding of responses.
//!
//! Decoding never panics. Every byte sequence yields either a typed value or
//! a classified [`ProtocolError`]:
//!
//! - nothing but whitespace on stdout is [`ProtocolError::NoResponse`];
//! - bytes that are not JSON are [`ProtocolError::Malformed`];
//! - JSON of the wrong shape is [`ProtocolError::SchemaViolation`].
//!
//! Absent optional fields are replaced by their defaults here, at the
//! boundary, so nothing downstream needs to be lenient.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::request::InvocationRequest;
use crate::response::{ActionResponse, InfoResponse, InvocationResponse, ResponseKind};

/// Maximum number of output bytes quoted back in a diagnostic.
const EXCERPT_LIMIT: usize = 200;

/// Errors produced by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The extension printed nothing.
    #[error("the extension produced no response")]
    NoResponse,
    /// The output is not valid JSON.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The output is JSON but does not match the expected schema.
    #[error("response does not match the {kind} schema: {message}")]
    SchemaViolation { kind: String, message: String },
    /// A request could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl ProtocolError {
    fn schema(kind: impl std::fmt::Display, message: impl Into<String>) -> Self {
        ProtocolError::SchemaViolation {
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

/// Serializes a request to the compact JSON written to an extension's stdin.
pub fn encode(request: &InvocationRequest) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(request).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decodes a response of the expected kind.
pub fn decode(bytes: &[u8], kind: ResponseKind) -> Result<InvocationResponse, ProtocolError> {
    match kind {
        ResponseKind::Info => decode_info(bytes).map(InvocationResponse::Info),
        ResponseKind::Action => decode_action(bytes).map(InvocationResponse::Action),
    }
}

/// Decodes an `info` response.
pub fn decode_info(bytes: &[u8]) -> Result<InfoResponse, ProtocolError> {
    let value = parse_object(bytes, ResponseKind::Info)?;
    let info: InfoResponse = from_value(value, ResponseKind::Info)?;

    if info.descriptor.name.trim().is_empty() {
        return Err(ProtocolError::schema(
            ResponseKind::Info,
            "`name` must not be empty",
        ));
    }
    if info.descriptor.version.trim().is_empty() {
        return Err(ProtocolError::schema(
            ResponseKind::Info,
            "`version` must not be empty",
        ));
    }

    Ok(info)
}

/// Decodes an `action` response.
pub fn decode_action(bytes: &[u8]) -> Result<ActionResponse, ProtocolError> {
    let value = parse_object(bytes, ResponseKind::Action)?;
    from_value(value, ResponseKind::Action)
}

/// Decodes a request. Used by extensions written against this crate.
///
/// A `type` other than `info` or `action` is a schema violation.
pub fn decode_request(bytes: &[u8]) -> Result<InvocationRequest, ProtocolError> {
    let value = parse_object(bytes, "request")?;
    from_value(value, "request")
}

fn parse_object(bytes: &[u8], kind: impl std::fmt::Display) -> Result<Value, ProtocolError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ProtocolError::NoResponse);
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ProtocolError::Malformed(format!("{} (output: {:?})", e, excerpt(bytes))))?;

    if !value.is_object() {
        return Err(ProtocolError::schema(
            kind,
            format!("expected a JSON object, found {}", json_type(&value)),
        ));
    }

    Ok(value)
}

fn from_value<T: DeserializeOwned>(
    value: Value,
    kind: impl std::fmt::Display,
) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::schema(kind, e.to_string()))
}

fn excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
