//! Side-effect bundles and whole-document aggregation.

use serde::Serialize;

use crate::error::CallSiteError;

/// A call-site that was replaced by an error marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteFailure {
    /// Extension named by the failed call.
    pub name: String,
    pub error: CallSiteError,
}

/// Side channels accumulated while resolving a content tree.
///
/// Lists keep the order in which call-sites were visited; duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SideEffectBundle {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub imports: Vec<String>,
    pub top: String,
    pub bottom: String,
    /// Typed record of the failures behind some of `errors`.
    #[serde(skip)]
    pub failures: Vec<CallSiteFailure>,
}

impl SideEffectBundle {
    /// Appends everything in `other` after what is already here.
    pub fn absorb(&mut self, other: SideEffectBundle) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.imports.extend(other.imports);
        self.top.push_str(&other.top);
        self.bottom.push_str(&other.bottom);
        self.failures.extend(other.failures);
    }

    /// Records a failed call-site.
    pub fn record_failure(&mut self, name: &str, error: CallSiteError) {
        self.errors
            .push(format!("Error from {} expression: {}", name, error));
        self.failures.push(CallSiteFailure {
            name: name.to_string(),
            error,
        });
    }

    /// Returns true if nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
            && self.warnings.is_empty()
            && self.imports.is_empty()
            && self.top.is_empty()
            && self.bottom.is_empty()
    }
}

/// Output of resolving one content tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub text: String,
    pub side_effects: SideEffectBundle,
}

/// One resolved top-level node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedFragment {
    pub text: String,
    pub top: String,
    pub bottom: String,
}

/// A fully resolved document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedDocument {
    pub fragments: Vec<ResolvedFragment>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub imports: Vec<String>,
    #[serde(skip)]
    pub failures: Vec<CallSiteFailure>,
}

impl ResolvedDocument {
    /// Body text, fragment by fragment.
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    /// Content destined for the top of the output document.
    pub fn top(&self) -> String {
        self.fragments.iter().map(|f| f.top.as_str()).collect()
    }

    /// Content destined for the bottom of the output document.
    pub fn bottom(&self) -> String {
        self.fragments.iter().map(|f| f.bottom.as_str()).collect()
    }

    /// Returns true if any call-site failed or an extension reported an error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Builds a [`ResolvedDocument`] fragment by fragment.
#[derive(Debug, Default)]
pub struct DocumentAggregator {
    document: ResolvedDocument,
}

impl DocumentAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a resolved fragment and its side channels.
    pub fn push(&mut self, resolution: Resolution) {
        let Resolution { text, side_effects } = resolution;
        self.document.fragments.push(ResolvedFragment {
            text,
            top: side_effects.top,
            bottom: side_effects.bottom,
        });
        self.document.errors.extend(side_effects.errors);
        self.document.warnings.extend(side_effects.warnings);
        self.document.imports.extend(side_effects.imports);
        self.document.failures.extend(side_effects.failures);
    }

    /// Appends document-level warnings, such as registry notices.
    pub fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = String>) {
        self.document.warnings.extend(warnings);
    }

    pub fn finish(self) -> ResolvedDocument {
        self.document
    }
}
