use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest command the remote interpreter accepts, in characters.
pub const COMMAND_LENGTH_LIMIT: usize = 8000;

/// Remote scratch directory every temp file lives under.
pub const REMOTE_TEMP_DIR: &str = "$env:TEMP";

// ─── Copy Options ────────────────────────────────────────────────────────────

/// Options for a single upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyOptions {
    /// Maximum chunk writes per remote shell before it is recycled (0 = 1)
    #[serde(default = "default_max_operations_per_shell")]
    pub max_operations_per_shell: usize,
    /// Log transfer milestones at info level instead of debug
    #[serde(default)]
    pub verbose: bool,
    /// Forward remote stdout/stderr to this process's streams
    #[serde(default = "default_echo_remote_output")]
    pub echo_remote_output: bool,
    #[serde(skip, default = "default_command_length_limit")]
    command_length_limit: usize,
}

fn default_max_operations_per_shell() -> usize {
    15
}

fn default_echo_remote_output() -> bool {
    true
}

fn default_command_length_limit() -> usize {
    COMMAND_LENGTH_LIMIT
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            max_operations_per_shell: default_max_operations_per_shell(),
            verbose: false,
            echo_remote_output: default_echo_remote_output(),
            command_length_limit: COMMAND_LENGTH_LIMIT,
        }
    }
}

impl CopyOptions {
    pub fn with_max_operations_per_shell(mut self, max: usize) -> Self {
        self.max_operations_per_shell = max;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_echo_remote_output(mut self, echo: bool) -> Self {
        self.echo_remote_output = echo;
        self
    }

    /// Override the command length limit so small inputs span many chunks.
    #[cfg(any(test, feature = "test-util"))]
    pub fn with_command_length_limit(mut self, limit: usize) -> Self {
        self.command_length_limit = limit;
        self
    }

    pub fn command_length_limit(&self) -> usize {
        self.command_length_limit
    }

    /// Chunk writes allowed per shell; a configured 0 means 1.
    pub fn effective_chunks_per_shell(&self) -> usize {
        self.max_operations_per_shell.max(1)
    }
}

// ─── Transfer Summary ────────────────────────────────────────────────────────

/// Outcome of a completed upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub temp_path: String,
    pub destination_path: String,
    pub bytes_transferred: u64,
    /// Chunks written in each shell, in the order the shells were opened
    pub chunks_per_session: Vec<usize>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl TransferSummary {
    pub fn sessions(&self) -> usize {
        self.chunks_per_session.len()
    }

    pub fn total_chunks(&self) -> usize {
        self.chunks_per_session.iter().sum()
    }
}

/// What the session loop reports back to the copy orchestration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub bytes: u64,
    pub chunks_per_session: Vec<usize>,
}
