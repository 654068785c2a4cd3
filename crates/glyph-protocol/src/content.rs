//! Content trees exchanged between the host and its extensions.

use serde::de::{self, value::MapAccessDeserializer, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A node in a content tree.
///
/// On the wire a raw text node is a bare JSON string and an extension call is
/// an object with `name`, `block` and `arguments`:
///
/// ```json
/// ["plain text", {"name": "code", "block": true, "arguments": ["fn main() {}", "rust"]}]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContentNode {
    /// Verbatim output text. The host never escapes it.
    RawText(String),
    /// A call-site that the host must resolve by invoking another extension.
    ExtensionCall(ExtensionCall),
}

/// A call-site naming an extension, its variant and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionCall {
    /// Name the extension was defined under.
    pub name: String,
    /// Block call (`true`) or inline call (`false`, the default).
    #[serde(default)]
    pub block: bool,
    /// Arguments, in call order.
    #[serde(default)]
    pub arguments: Vec<ContentNode>,
}

impl ExtensionCall {
    /// Creates an inline call without arguments.
    pub fn inline(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            block: false,
            arguments: Vec::new(),
        }
    }

    /// Creates a block call without arguments.
    pub fn block(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            block: true,
            arguments: Vec::new(),
        }
    }

    /// Appends an argument.
    pub fn with_argument(mut self, argument: impl Into<ContentNode>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Returns the first argument if it is raw text.
    pub fn first_text_argument(&self) -> Option<&str> {
        self.arguments.first().and_then(ContentNode::as_text)
    }
}

impl ContentNode {
    /// Creates a raw text node.
    pub fn text(text: impl Into<String>) -> Self {
        ContentNode::RawText(text.into())
    }

    /// Returns the text of a raw text node.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentNode::RawText(text) => Some(text),
            ContentNode::ExtensionCall(_) => None,
        }
    }

    /// Returns the call of an extension call node.
    pub fn as_call(&self) -> Option<&ExtensionCall> {
        match self {
            ContentNode::RawText(_) => None,
            ContentNode::ExtensionCall(call) => Some(call),
        }
    }

    /// Returns true if this node is an extension call.
    pub fn is_call(&self) -> bool {
        matches!(self, ContentNode::ExtensionCall(_))
    }
}

impl From<&str> for ContentNode {
    fn from(text: &str) -> Self {
        ContentNode::RawText(text.to_string())
    }
}

impl From<String> for ContentNode {
    fn from(text: String) -> Self {
        ContentNode::RawText(text)
    }
}

impl From<ExtensionCall> for ContentNode {
    fn from(call: ExtensionCall) -> Self {
        ContentNode::ExtensionCall(call)
    }
}

// Hand-written so schema errors name what was expected instead of serde's
// generic "did not match any variant of untagged enum".
impl<'de> Deserialize<'de> for ContentNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NodeVisitor;

        impl<'de> Visitor<'de> for NodeVisitor {
            type Value = ContentNode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or an extension call object")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ContentNode, E> {
                Ok(ContentNode::RawText(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<ContentNode, E> {
                Ok(ContentNode::RawText(value))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<ContentNode, A::Error> {
                let call = ExtensionCall::deserialize(MapAccessDeserializer::new(map))?;
                if call.name.trim().is_empty() {
                    return Err(de::Error::invalid_value(
                        de::Unexpected::Str(&call.name),
                        &"a non-empty extension name",
                    ));
                }
                Ok(ContentNode::ExtensionCall(call))
            }
        }

        deserializer.deserialize_any(NodeVisitor)
    }
}
