//! Glyph extension protocol.
//!
//! Glyph documents call out to *extensions*: external programs that receive a
//! single JSON request on stdin and print a single JSON response on stdout.
//! This crate defines those messages and the codec that validates them.
//!
//! # Overview
//!
//! Every extension answers two request types:
//!
//! 1. **Info**: describe yourself (name, version, supported output formats,
//!    block/inline support, metadata interests)
//! 2. **Action**: produce replacement content for one call-site
//!
//! Action content is a sequence of [`ContentNode`]s. Raw text is emitted
//! verbatim; [`ExtensionCall`] nodes are resolved by the host, which may in
//! turn invoke further extensions.
//!
//! # Example
//!
//! ```
//! use glyph_protocol::{decode_action, ContentNode};
//!
//! let response = decode_action(br#"{"content": ["Hello, ", {"name": "b", "arguments": ["world"]}]}"#)
//!     .unwrap();
//!
//! assert_eq!(response.content.len(), 2);
//! assert_eq!(response.content[0], ContentNode::text("Hello, "));
//! assert!(response.errors.is_empty());
//! ```
//!
//! # Modules
//!
//! - [`content`]: content tree nodes
//! - [`request`]: `info` and `action` requests
//! - [`response`]: `info` and `action` responses
//! - [`codec`]: encoding and validating decoding

pub mod codec;
pub mod content;
pub mod request;
pub mod response;

pub use codec::{decode, decode_action, decode_info, decode_request, encode, ProtocolError};
pub use content::{ContentNode, ExtensionCall};
pub use request::{ActionRequest, InfoRequest, InvocationRequest, PROTOCOL_VERSION};
pub use response::{
    ActionResponse, ExtensionDescriptor, InfoResponse, InvocationResponse, ResponseKind,
};

#[cfg(test)]
mod tests;
