//! Recursive resolution of content trees.
//!
//! Sibling call-sites run concurrently and are joined by index, so output
//! order always follows source order. A response's side channels are merged
//! before the content it returned is resolved, which keeps the merged lists
//! in pre-order.

use futures_util::future::{join_all, BoxFuture, FutureExt};
use glyph_protocol::{decode_action, encode, ContentNode, ExtensionCall, InvocationRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cancel::CancelSignal;
use crate::config::HostConfig;
use crate::document::{DocumentAggregator, Resolution, ResolvedDocument, SideEffectBundle};
use crate::error::{CallSiteError, DescriptorError, InvokeError, ResolveError};
use crate::invoker::ProcessInvoker;
use crate::markup::{escape_text, MarkupParser};
use crate::registry::{ExtensionRegistry, IDENTITY_EXTENSION};

/// Why resolving a call did not produce a resolution.
enum Failure {
    CallSite(CallSiteError),
    Cancelled,
}

impl From<CallSiteError> for Failure {
    fn from(error: CallSiteError) -> Self {
        Failure::CallSite(error)
    }
}

/// Resolves content trees against one document's registry.
pub struct Resolver {
    registry: Arc<ExtensionRegistry>,
    parser: Arc<dyn MarkupParser>,
    config: HostConfig,
    invoker: ProcessInvoker,
    timeout: Duration,
}

impl Resolver {
    /// Creates a resolver that is never cancelled.
    ///
    /// The invocation timeout is fixed here, from the configuration and the
    /// document's `timeout` metadata field.
    pub fn new(
        registry: Arc<ExtensionRegistry>,
        parser: Arc<dyn MarkupParser>,
        config: HostConfig,
    ) -> Self {
        let invoker = ProcessInvoker::new(config.max_concurrency, CancelSignal::never());
        let timeout = config.effective_timeout(registry.metadata());
        Self {
            registry,
            parser,
            config,
            invoker,
            timeout,
        }
    }

    /// Makes every invocation observe `signal`.
    pub fn with_cancel(mut self, signal: CancelSignal) -> Self {
        self.invoker = ProcessInvoker::new(self.config.max_concurrency, signal);
        self
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    /// Timeout applied to each extension exchange.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves a content tree to text and side channels.
    ///
    /// Individual call-sites never fail the tree: each failure is recorded in
    /// the bundle and the call-site is replaced by an error marker. The only
    /// error is cancellation, reported once every sibling has finished.
    pub async fn resolve(
        &self,
        tree: &[ContentNode],
        format: &str,
    ) -> Result<Resolution, ResolveError> {
        let mut resolution = Resolution::default();
        for fragment in self.resolve_fragments(tree, format).await? {
            resolution.text.push_str(&fragment.text);
            resolution.side_effects.absorb(fragment.side_effects);
        }
        Ok(resolution)
    }

    /// Resolves each top-level node as its own fragment and aggregates them,
    /// together with the registry's definition-time notices.
    pub async fn resolve_document(
        &self,
        tree: &[ContentNode],
        format: &str,
    ) -> Result<ResolvedDocument, ResolveError> {
        let fragments = self.resolve_fragments(tree, format).await?;

        let mut aggregator = DocumentAggregator::new();
        for fragment in fragments {
            aggregator.push(fragment);
        }
        aggregator.extend_warnings(self.registry.take_notices());
        Ok(aggregator.finish())
    }

    async fn resolve_fragments(
        &self,
        tree: &[ContentNode],
        format: &str,
    ) -> Result<Vec<Resolution>, ResolveError> {
        let results = join_all(tree.iter().map(|node| self.resolve_top(node, format))).await;
        // Only cancellation reaches this point.
        results
            .into_iter()
            .map(|result| result.map_err(|_| ResolveError::Cancelled))
            .collect()
    }

    /// Resolves a top-level node. A runaway nesting chain stops here.
    async fn resolve_top(&self, node: &ContentNode, format: &str) -> Result<Resolution, Failure> {
        match self.resolve_node(node, format, 0).await {
            Ok(resolution) => Ok(resolution),
            Err(Failure::CallSite(error)) => {
                let name = node.as_call().map_or("", |call| call.name.as_str());
                Ok(self.failed(name, error, format))
            }
            Err(Failure::Cancelled) => Err(Failure::Cancelled),
        }
    }

    async fn resolve_node(
        &self,
        node: &ContentNode,
        format: &str,
        depth: usize,
    ) -> Result<Resolution, Failure> {
        let call = match node {
            ContentNode::RawText(text) => {
                return Ok(Resolution {
                    text: text.clone(),
                    side_effects: SideEffectBundle::default(),
                })
            }
            ContentNode::ExtensionCall(call) => call,
        };

        match self.resolve_call(call, format, depth).await {
            Err(Failure::CallSite(error))
                if !matches!(error, CallSiteError::RecursionLimitExceeded { .. }) =>
            {
                Ok(self.failed(&call.name, error, format))
            }
            outcome => outcome,
        }
    }

    fn resolve_sequence<'a>(
        &'a self,
        nodes: &'a [ContentNode],
        format: &'a str,
        depth: usize,
    ) -> BoxFuture<'a, Result<Resolution, Failure>> {
        async move {
            let results =
                join_all(nodes.iter().map(|node| self.resolve_node(node, format, depth))).await;

            let mut resolution = Resolution::default();
            let mut interruption = None;
            for result in results {
                match result {
                    Ok(part) => {
                        resolution.text.push_str(&part.text);
                        resolution.side_effects.absorb(part.side_effects);
                    }
                    Err(Failure::Cancelled) => interruption = Some(Failure::Cancelled),
                    Err(failure) => {
                        if interruption.is_none() {
                            interruption = Some(failure);
                        }
                    }
                }
            }

            match interruption {
                Some(failure) => Err(failure),
                None => Ok(resolution),
            }
        }
        .boxed()
    }

    async fn resolve_call(
        &self,
        call: &ExtensionCall,
        format: &str,
        depth: usize,
    ) -> Result<Resolution, Failure> {
        if depth >= self.config.max_depth {
            return Err(CallSiteError::RecursionLimitExceeded {
                limit: self.config.max_depth,
            }
            .into());
        }
        if self.invoker.cancel_signal().is_cancelled() {
            return Err(Failure::Cancelled);
        }

        if call.name == IDENTITY_EXTENSION {
            return self.resolve_identity(call, format, depth).await;
        }

        let spec = self
            .registry
            .resolve(&call.name)
            .map_err(|_| CallSiteError::UnknownExtension(call.name.clone()))?;

        let descriptor = self
            .registry
            .describe(&call.name, format, &self.invoker, self.timeout)
            .await
            .map_err(|error| match error {
                DescriptorError::Cancelled => Failure::Cancelled,
                other => Failure::CallSite(other.into()),
            })?;

        if !descriptor.supports_variant(call.block) {
            return Err(CallSiteError::UnsupportedVariant { block: call.block }.into());
        }

        let request = InvocationRequest::action(
            format,
            call.block,
            call.arguments.clone(),
            self.registry.metadata_for(&descriptor),
        );
        let bytes = encode(&request).map_err(CallSiteError::from)?;

        let output = self
            .invoker
            .invoke(&spec.command, &bytes, self.timeout)
            .await
            .map_err(|error| match error {
                InvokeError::Cancelled => Failure::Cancelled,
                other => Failure::CallSite(other.into()),
            })?;
        debug!(
            extension = %call.name,
            depth,
            duration_ms = output.duration.as_millis() as u64,
            "extension call answered"
        );

        let response = decode_action(&output.stdout).map_err(CallSiteError::from)?;

        let mut side_effects = SideEffectBundle {
            errors: response
                .errors
                .iter()
                .map(|e| format!("Error from {} expression: {}", call.name, e))
                .collect(),
            warnings: response
                .warnings
                .iter()
                .map(|w| format!("Warning from {} expression: {}", call.name, w))
                .collect(),
            imports: response.imports,
            top: response.top,
            bottom: response.bottom,
            failures: Vec::new(),
        };

        let nested = self
            .resolve_sequence(&response.content, format, depth + 1)
            .await?;
        side_effects.absorb(nested.side_effects);

        Ok(Resolution {
            text: nested.text,
            side_effects,
        })
    }

    /// Parses the identity call's argument as markup and resolves the result
    /// in place. No process is involved.
    async fn resolve_identity(
        &self,
        call: &ExtensionCall,
        format: &str,
        depth: usize,
    ) -> Result<Resolution, Failure> {
        let source = call
            .first_text_argument()
            .ok_or(CallSiteError::IdentityArgument)?;
        let nodes = self
            .parser
            .parse(source, format)
            .map_err(|e| CallSiteError::Markup(e.message))?;

        self.resolve_sequence(&nodes, format, depth + 1).await
    }

    fn failed(&self, name: &str, error: CallSiteError, format: &str) -> Resolution {
        warn!(extension = %name, error = %error, "call-site failed");
        let mut side_effects = SideEffectBundle::default();
        side_effects.record_failure(name, error);
        Resolution {
            text: error_marker(name, format),
            side_effects,
        }
    }
}

/// Inert text that replaces a failed call-site.
pub fn error_marker(name: &str, format: &str) -> String {
    let name = escape_text(name, format);
    match format {
        "html" => format!(
            "<span class=\"extension-error\" data-extension=\"{}\"></span>",
            name
        ),
        "latex" => format!("\\textbf{{[{}]}}", name),
        _ => format!("[{}]", name),
    }
}
