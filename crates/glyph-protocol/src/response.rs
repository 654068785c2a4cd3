//! Responses an extension prints on stdout.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::content::ContentNode;

/// The two response schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Info,
    Action,
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseKind::Info => write!(f, "info"),
            ResponseKind::Action => write!(f, "action"),
        }
    }
}

/// Capabilities an extension reports in its `info` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDescriptor {
    /// Display name of the extension.
    pub name: String,
    /// Version string reported by the extension.
    pub version: String,
    /// Short human-readable description.
    #[serde(default)]
    pub description: String,
    /// Output formats the extension can produce content for.
    pub supported_formats: BTreeSet<String>,
    /// Whether block call-sites are supported.
    pub block_support: bool,
    /// Whether inline call-sites are supported.
    pub inline_support: bool,
    /// Document metadata keys the extension wants to receive.
    #[serde(default)]
    pub interests: Vec<String>,
}

impl ExtensionDescriptor {
    /// Creates a descriptor supporting both variants and no formats.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            supported_formats: BTreeSet::new(),
            block_support: true,
            inline_support: true,
            interests: Vec::new(),
        }
    }

    /// Adds a supported output format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.supported_formats.insert(format.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a metadata interest.
    pub fn with_interest(mut self, key: impl Into<String>) -> Self {
        self.interests.push(key.into());
        self
    }

    /// Returns true if content can be produced for `format`.
    pub fn supports_format(&self, format: &str) -> bool {
        self.supported_formats.contains(format)
    }

    /// Returns true if the call variant (block or inline) is supported.
    pub fn supports_variant(&self, block: bool) -> bool {
        if block {
            self.block_support
        } else {
            self.inline_support
        }
    }
}

/// Full `info` response: the descriptor plus definition-time diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoResponse {
    #[serde(flatten)]
    pub descriptor: ExtensionDescriptor,
    /// Errors that make the extension unusable for this document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Non-fatal diagnostics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl InfoResponse {
    pub fn new(descriptor: ExtensionDescriptor) -> Self {
        Self {
            descriptor,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// `action` response. Every field except `content` is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Packages/resources the rendered document must import.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    /// Text injected at the top of the rendered document.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub top: String,
    /// Text injected at the bottom of the rendered document.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bottom: String,
    /// Replacement content for the call-site.
    pub content: Vec<ContentNode>,
}

impl ActionResponse {
    /// Creates a response with the given content and no side channels.
    pub fn with_content(content: Vec<ContentNode>) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }
}

/// A decoded response of either kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationResponse {
    Info(InfoResponse),
    Action(ActionResponse),
}

impl InvocationResponse {
    pub fn kind(&self) -> ResponseKind {
        match self {
            InvocationResponse::Info(_) => ResponseKind::Info,
            InvocationResponse::Action(_) => ResponseKind::Action,
        }
    }

    pub fn into_info(self) -> Option<InfoResponse> {
        match self {
            InvocationResponse::Info(info) => Some(info),
            InvocationResponse::Action(_) => None,
        }
    }

    pub fn into_action(self) -> Option<ActionResponse> {
        match self {
            InvocationResponse::Info(_) => None,
            InvocationResponse::Action(action) => Some(action),
        }
    }
}
