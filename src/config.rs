//! Client configuration: JSON file plus environment overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use winrmcp_core::{CopyError, CopyOptions, CopyResult};

/// Non-empty value turns on verbose transfer logging.
pub const ENV_DEBUG: &str = "WINRMCP_DEBUG";
/// Overrides `maxOperationsPerShell`.
pub const ENV_MAX_OPERATIONS_PER_SHELL: &str = "WINRMCP_MAX_OPERATIONS_PER_SHELL";

// ─── Winrmcp Config ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinrmcpConfig {
    /// Chunk writes per remote shell before the shell is recycled
    #[serde(default = "default_max_operations_per_shell")]
    pub max_operations_per_shell: usize,
    /// Log transfer milestones at info level
    #[serde(default)]
    pub verbose: bool,
    /// Forward remote stdout/stderr to this process
    #[serde(default = "default_echo_remote_output")]
    pub echo_remote_output: bool,
}

fn default_max_operations_per_shell() -> usize {
    15
}

fn default_echo_remote_output() -> bool {
    true
}

impl Default for WinrmcpConfig {
    fn default() -> Self {
        Self {
            max_operations_per_shell: default_max_operations_per_shell(),
            verbose: false,
            echo_remote_output: default_echo_remote_output(),
        }
    }
}

impl WinrmcpConfig {
    pub fn from_json(json: &str) -> CopyResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CopyError::invalid_config(format!("Invalid configuration: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> CopyResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CopyError::io_error(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json).map_err(|e| e.context(path.display()))
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> CopyResult<Self> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> CopyResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup` instead of the process
    /// environment.
    pub fn with_overrides<F>(mut self, lookup: F) -> CopyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_DEBUG) {
            if !v.is_empty() {
                self.verbose = true;
            }
        }
        if let Some(v) = lookup(ENV_MAX_OPERATIONS_PER_SHELL) {
            self.max_operations_per_shell = v.trim().parse().map_err(|_| {
                CopyError::invalid_config(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_MAX_OPERATIONS_PER_SHELL, v
                ))
            })?;
        }
        Ok(self)
    }

    pub fn copy_options(&self) -> CopyOptions {
        CopyOptions::default()
            .with_max_operations_per_shell(self.max_operations_per_shell)
            .with_verbose(self.verbose)
            .with_echo_remote_output(self.echo_remote_output)
    }
}

impl From<&WinrmcpConfig> for CopyOptions {
    fn from(config: &WinrmcpConfig) -> Self {
        config.copy_options()
    }
}
