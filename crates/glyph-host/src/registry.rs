//! Per-document registry of extension definitions and descriptors.

use glyph_protocol::{decode_info, encode, ExtensionDescriptor, InvocationRequest};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{DescriptorError, RegistryError};
use crate::invoker::ProcessInvoker;

/// Name of the built-in pass-through extension. Its argument is parsed as
/// markup instead of being sent to a process.
pub const IDENTITY_EXTENSION: &str = "id";

/// How to launch an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Name call-sites use to refer to the extension.
    pub name: String,
    /// Program followed by its arguments.
    pub command: Vec<String>,
}

impl LaunchSpec {
    /// Creates a launch spec from an argv.
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
        }
    }

    /// Creates a launch spec that runs `command_line` through the platform shell,
    /// as written in a `| define, name, python ext.py |` directive.
    pub fn shell(name: impl Into<String>, command_line: &str) -> Self {
        let (shell, flag) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        Self::new(
            name,
            vec![shell.to_string(), flag.to_string(), command_line.to_string()],
        )
    }
}

type DescriptorCell = Arc<OnceCell<Result<Arc<ExtensionDescriptor>, DescriptorError>>>;

/// Marker for an `info` exchange interrupted by cancellation.
struct Interrupted;

/// Registry of the extensions defined in one document.
///
/// Definitions are added up front with [`define`](Self::define); afterwards the
/// registry is shared (behind an `Arc`) by every concurrent resolution of the
/// document. Descriptors are fetched lazily, once per name.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    /// Launch specs indexed by name.
    launch_specs: HashMap<String, Arc<LaunchSpec>>,
    /// One cell per described name; failures are cached too.
    descriptors: Mutex<HashMap<String, DescriptorCell>>,
    /// Definition-time warnings, keyed by extension name.
    notices: Mutex<BTreeMap<String, Vec<String>>>,
    /// Document metadata.
    metadata: BTreeMap<String, String>,
    /// Number of `info` exchanges performed.
    info_exchanges: AtomicUsize,
}

impl ExtensionRegistry {
    /// Creates an empty registry without metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry for a document with the given metadata.
    pub fn with_metadata(metadata: BTreeMap<String, String>) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    /// Sets a document metadata field.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Document metadata.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Defines an extension.
    pub fn define(&mut self, spec: LaunchSpec) -> Result<(), RegistryError> {
        if spec.name == IDENTITY_EXTENSION {
            return Err(RegistryError::Reserved(spec.name));
        }
        if !is_valid_extension_name(&spec.name) {
            return Err(RegistryError::InvalidName(spec.name));
        }
        if spec.command.first().map_or(true, |program| program.trim().is_empty()) {
            return Err(RegistryError::EmptyCommand(spec.name));
        }
        if self.launch_specs.contains_key(&spec.name) {
            return Err(RegistryError::AlreadyDefined(spec.name));
        }

        debug!(name = %spec.name, command = ?spec.command, "extension defined");
        self.launch_specs.insert(spec.name.clone(), Arc::new(spec));
        Ok(())
    }

    /// Looks up the launch spec for `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<LaunchSpec>, RegistryError> {
        self.launch_specs
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownExtension(name.to_string()))
    }

    /// Returns true if `name` has been defined.
    pub fn is_defined(&self, name: &str) -> bool {
        self.launch_specs.contains_key(name)
    }

    /// Defined names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.launch_specs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of defined extensions.
    pub fn len(&self) -> usize {
        self.launch_specs.len()
    }

    /// Returns true if no extensions are defined.
    pub fn is_empty(&self) -> bool {
        self.launch_specs.is_empty()
    }

    /// Returns the descriptor for `name`, running the `info` exchange on first use.
    ///
    /// Concurrent first callers share a single exchange. Its outcome, success
    /// or failure, is cached for the lifetime of the registry; only
    /// cancellation leaves the cell empty. The format check runs on every
    /// call against the cached descriptor.
    pub async fn describe(
        &self,
        name: &str,
        format: &str,
        invoker: &ProcessInvoker,
        timeout: Duration,
    ) -> Result<Arc<ExtensionDescriptor>, DescriptorError> {
        let spec = self
            .resolve(name)
            .map_err(|_| DescriptorError::UnknownExtension(name.to_string()))?;

        let cell = {
            let mut cells = self.descriptors.lock().unwrap_or_else(PoisonError::into_inner);
            cells.entry(name.to_string()).or_default().clone()
        };

        let cached = cell
            .get_or_try_init(|| async {
                match self.fetch_descriptor(&spec, format, invoker, timeout).await {
                    Err(DescriptorError::Cancelled) => Err(Interrupted),
                    outcome => Ok(outcome),
                }
            })
            .await;

        let descriptor = match cached {
            Ok(Ok(descriptor)) => descriptor.clone(),
            Ok(Err(error)) => return Err(error.clone()),
            Err(Interrupted) => return Err(DescriptorError::Cancelled),
        };

        if !descriptor.supports_format(format) {
            return Err(DescriptorError::UnsupportedFormat {
                format: format.to_string(),
                supported: descriptor.supported_formats.iter().cloned().collect(),
            });
        }

        Ok(descriptor)
    }

    /// Returns the cached descriptor for `name`, if its exchange succeeded.
    pub fn cached_descriptor(&self, name: &str) -> Option<Arc<ExtensionDescriptor>> {
        let cells = self.descriptors.lock().unwrap_or_else(PoisonError::into_inner);
        cells
            .get(name)
            .and_then(|cell| cell.get())
            .and_then(|outcome| outcome.as_ref().ok())
            .cloned()
    }

    /// Number of `info` exchanges performed so far.
    pub fn info_exchanges(&self) -> usize {
        self.info_exchanges.load(Ordering::SeqCst)
    }

    /// Drains definition-time warnings, ordered by extension name.
    pub fn take_notices(&self) -> Vec<String> {
        let mut notices = self.notices.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *notices).into_values().flatten().collect()
    }

    /// The subset of document metadata the extension declared an interest in.
    pub fn metadata_for(&self, descriptor: &ExtensionDescriptor) -> BTreeMap<String, String> {
        descriptor
            .interests
            .iter()
            .filter_map(|key| {
                self.metadata
                    .get(key)
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect()
    }

    async fn fetch_descriptor(
        &self,
        spec: &LaunchSpec,
        format: &str,
        invoker: &ProcessInvoker,
        timeout: Duration,
    ) -> Result<Arc<ExtensionDescriptor>, DescriptorError> {
        self.info_exchanges.fetch_add(1, Ordering::SeqCst);

        let request = InvocationRequest::info(format, self.metadata.keys().cloned().collect());
        let bytes = encode(&request).map_err(DescriptorError::Protocol)?;

        let output = invoker
            .invoke(&spec.command, &bytes, timeout)
            .await
            .map_err(|e| match e {
                crate::error::InvokeError::Cancelled => DescriptorError::Cancelled,
                other => {
                    warn!(name = %spec.name, error = %other, "info exchange failed");
                    DescriptorError::Invocation(other)
                }
            })?;

        let info = decode_info(&output.stdout).map_err(DescriptorError::Protocol)?;

        if !info.warnings.is_empty() {
            let warnings = info
                .warnings
                .iter()
                .map(|w| {
                    format!(
                        "{} had the following warning when being defined: {}",
                        spec.name, w
                    )
                })
                .collect();
            self.notices
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(spec.name.clone(), warnings);
        }

        if !info.errors.is_empty() {
            return Err(DescriptorError::Reported(info.errors));
        }

        debug!(
            name = %spec.name,
            extension = %info.descriptor.name,
            version = %info.descriptor.version,
            "extension described"
        );
        Ok(Arc::new(info.descriptor))
    }
}

/// Names must be non-empty and free of whitespace and of the `,` and `|`
/// characters that delimit call-sites in markup.
fn is_valid_extension_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| !c.is_whitespace() && c != ',' && c != '|')
}
