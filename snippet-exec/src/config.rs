//! Service configuration, supplied once at process start.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{error::Error, types::ResourceLimits};

/// Program names (or absolute paths) of the external toolchains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchains {
    pub python: String,
    pub node: String,
    pub javac: String,
    pub java: String,
    pub cxx: String,
}

impl Default for Toolchains {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            node: "node".to_string(),
            javac: "javac".to_string(),
            java: "java".to_string(),
            cxx: "g++".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory under which per-request workspaces are created
    pub scratch_root: PathBuf,
    /// Maximum number of executions running at once
    pub max_concurrent: usize,
    /// How long a request may wait for an execution slot
    pub queue_timeout_ms: u64,
    /// Per-step timeout when the caller does not supply one
    pub default_timeout_secs: u64,
    /// Upper bound for caller-supplied timeouts
    pub max_timeout_secs: u64,
    /// Per-stream capture ceiling
    pub max_output_bytes: usize,
    /// Largest accepted source text
    pub max_source_bytes: usize,
    pub limits: ResourceLimits,
    pub toolchains: Toolchains,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            scratch_root: std::env::temp_dir().join("snippet-exec"),
            max_concurrent: 10,
            queue_timeout_ms: 5_000,
            default_timeout_secs: 5,
            max_timeout_secs: 30,
            max_output_bytes: 1024 * 1024, // 1MB
            max_source_bytes: 256 * 1024, // 256KB
            limits: ResourceLimits::default(),
            toolchains: Toolchains::default(),
        }
    }
}

impl ServiceConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        let config: ServiceConfig =
            toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_concurrent == 0 {
            return Err(Error::Config("max_concurrent must be at least 1".into()));
        }
        if self.default_timeout_secs == 0 || self.max_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be at least 1 second".into()));
        }
        if self.default_timeout_secs > self.max_timeout_secs {
            return Err(Error::Config(format!(
                "default_timeout_secs ({}) exceeds max_timeout_secs ({})",
                self.default_timeout_secs, self.max_timeout_secs
            )));
        }
        // A busy loop must hit the wall-clock deadline before the CPU limit
        if self.limits.cpu_time_secs < self.max_timeout_secs {
            return Err(Error::Config(format!(
                "limits.cpu_time_secs ({}) is below max_timeout_secs ({})",
                self.limits.cpu_time_secs, self.max_timeout_secs
            )));
        }
        if self.max_output_bytes == 0 {
            return Err(Error::Config("max_output_bytes must be positive".into()));
        }
        Ok(())
    }

    /// Clamp a caller-supplied timeout to the configured ceiling
    pub fn effective_timeout(&self, requested: Option<Duration>) -> Duration {
        let max = Duration::from_secs(self.max_timeout_secs);
        match requested {
            Some(t) if !t.is_zero() => t.min(max),
            _ => Duration::from_secs(self.default_timeout_secs),
        }
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }
}
