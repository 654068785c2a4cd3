//! Requests the host writes to an extension's stdin.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::content::ContentNode;
use crate::response::ResponseKind;

/// Protocol version sent with every request.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A single request. Each extension process receives exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InvocationRequest {
    /// Ask the extension to describe itself.
    Info(InfoRequest),
    /// Ask the extension to produce content for one call-site.
    Action(ActionRequest),
}

/// Body of an `info` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoRequest {
    /// Host protocol version.
    pub version: String,
    /// Output format of the document being processed (e.g. `html`).
    pub output_format: String,
    /// Metadata keys available in the document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
}

/// Body of an `action` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    /// Host protocol version.
    pub version: String,
    /// Output format of the document being processed.
    pub output_format: String,
    /// Whether the call-site is a block call.
    #[serde(default)]
    pub block: bool,
    /// Call-site arguments.
    #[serde(default)]
    pub arguments: Vec<ContentNode>,
    /// Document metadata the extension declared an interest in.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl InvocationRequest {
    /// Creates an `info` request.
    pub fn info(output_format: impl Into<String>, interests: Vec<String>) -> Self {
        InvocationRequest::Info(InfoRequest {
            version: PROTOCOL_VERSION.to_string(),
            output_format: output_format.into(),
            interests,
        })
    }

    /// Creates an `action` request.
    pub fn action(
        output_format: impl Into<String>,
        block: bool,
        arguments: Vec<ContentNode>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        InvocationRequest::Action(ActionRequest {
            version: PROTOCOL_VERSION.to_string(),
            output_format: output_format.into(),
            block,
            arguments,
            metadata,
        })
    }

    /// The kind of response this request expects.
    pub fn expected_response(&self) -> ResponseKind {
        match self {
            InvocationRequest::Info(_) => ResponseKind::Info,
            InvocationRequest::Action(_) => ResponseKind::Action,
        }
    }

    /// Output format the request was built for.
    pub fn output_format(&self) -> &str {
        match self {
            InvocationRequest::Info(req) => &req.output_format,
            InvocationRequest::Action(req) => &req.output_format,
        }
    }
}
