//! Host configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Document metadata key that overrides the invocation timeout.
pub const TIMEOUT_METADATA_KEY: &str = "timeout";

/// Configuration shared by every resolution in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Per-invocation timeout in milliseconds (default: 2000).
    pub timeout_ms: u64,
    /// Maximum nesting of extension calls (default: 32).
    pub max_depth: usize,
    /// Maximum number of extension processes alive at once.
    pub max_concurrency: usize,
}

fn default_timeout_ms() -> u64 {
    2_000
}

fn default_max_depth() -> usize {
    32
}

fn default_max_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_depth: default_max_depth(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {message}")]
    Read { path: String, message: String },
    #[error("failed to parse config '{path}': {message}")]
    Parse { path: String, message: String },
    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl HostConfig {
    /// Loads a JSON configuration file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config: HostConfig = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks every field and reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.timeout_ms == 0 {
            problems.push("timeout_ms must be at least 1".to_string());
        }
        if self.max_depth == 0 {
            problems.push("max_depth must be at least 1".to_string());
        }
        if self.max_concurrency == 0 {
            problems.push("max_concurrency must be at least 1".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// Configured per-invocation timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Timeout for a document, honouring its `timeout` metadata field.
    ///
    /// Unparseable values fall back to the configured timeout.
    pub fn effective_timeout(&self, metadata: &BTreeMap<String, String>) -> Duration {
        metadata
            .get(TIMEOUT_METADATA_KEY)
            .and_then(|value| parse_timeout(value))
            .unwrap_or_else(|| self.timeout())
    }
}

/// Parses a timeout such as `3`, `3s`, `2.5 seconds` or `500ms`.
///
/// Bare numbers are seconds. Zero, negative and non-finite values are rejected.
pub fn parse_timeout(value: &str) -> Option<Duration> {
    let value = value.trim().to_ascii_lowercase();

    let (number, per_second) = if let Some(ms) = value.strip_suffix("ms") {
        (ms, 1000.0)
    } else {
        let secs = ["seconds", "second", "secs", "sec", "s"]
            .iter()
            .find_map(|suffix| value.strip_suffix(suffix))
            .unwrap_or(&value);
        (secs, 1.0)
    };

    let amount: f64 = number.trim().parse().ok()?;
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(amount / per_second).ok()
}
