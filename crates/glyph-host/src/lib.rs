//! Glyph extension host.
//!
//! Resolves content trees whose call-sites are answered by external extension
//! processes speaking the [`glyph_protocol`] wire format.
//!
//! # Overview
//!
//! - [`ExtensionRegistry`]: the extensions a document defines, their cached
//!   descriptors and the document metadata
//! - [`ProcessInvoker`]: one process per exchange, bounded by a worker pool,
//!   with timeouts and cancellation
//! - [`Resolver`]: concurrent, recursive resolution with per-call-site
//!   failure isolation
//! - [`DocumentAggregator`]: merges resolved fragments into a
//!   [`ResolvedDocument`]
//! - [`InlineMarkup`]: reference [`MarkupParser`] used by the identity
//!   extension
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use glyph_host::{ExtensionCall, ExtensionRegistry, HostConfig, InlineMarkup, Resolver};
//! use glyph_protocol::ContentNode;
//!
//! let resolver = Resolver::new(
//!     Arc::new(ExtensionRegistry::new()),
//!     Arc::new(InlineMarkup),
//!     HostConfig::default(),
//! );
//! let tree = vec![
//!     ContentNode::text("Say "),
//!     ExtensionCall::inline("id").with_argument("**hello**").into(),
//! ];
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let resolution = runtime.block_on(resolver.resolve(&tree, "html")).unwrap();
//! assert_eq!(resolution.text, "Say <b>hello</b>");
//! ```

pub mod cancel;
pub mod config;
pub mod document;
pub mod error;
pub mod invoker;
pub mod markup;
pub mod registry;
pub mod resolver;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::{parse_timeout, ConfigError, HostConfig, TIMEOUT_METADATA_KEY};
pub use document::{
    CallSiteFailure, DocumentAggregator, Resolution, ResolvedDocument, ResolvedFragment,
    SideEffectBundle,
};
pub use error::{CallSiteError, DescriptorError, InvokeError, RegistryError, ResolveError};
pub use glyph_protocol::{ContentNode, ExtensionCall, ExtensionDescriptor};
pub use invoker::{InvocationOutput, ProcessInvoker};
pub use markup::{escape_text, InlineMarkup, MarkupError, MarkupParser};
pub use registry::{ExtensionRegistry, LaunchSpec, IDENTITY_EXTENSION};
pub use resolver::{error_marker, Resolver};
