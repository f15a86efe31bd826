//! Transfer error type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorised transfer error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyError {
    pub kind: CopyErrorKind,
    pub message: String,
    /// Exit code of the remote command that triggered the error, if any.
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CopyErrorKind {
    /// The remote shell could not be created.
    SessionCreation,
    /// Reading the local source failed (anything but a clean end-of-stream).
    SourceRead,
    /// Appending a chunk to the remote temp file failed.
    Transmit,
    /// A remote command could not be submitted or returned a nonzero exit code.
    CommandFailed,
    /// The restore script failed.
    Restore,
    /// The restore destination is an existing directory.
    DestinationIsDirectory,
    /// The cleanup script failed.
    Cleanup,
    /// No unique identifier could be generated.
    Naming,
    /// Options or paths that make the transfer impossible.
    InvalidConfig,
    /// Local I/O failure outside of the source stream.
    Io,
}

pub type CopyResult<T> = Result<T, CopyError>;

// ── Construction helpers ─────────────────────────────────────────────

impl CopyError {
    pub fn new(kind: CopyErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            exit_code: None,
        }
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Prefix the message with caller context, keeping kind and exit code.
    pub fn context(mut self, ctx: impl fmt::Display) -> Self {
        self.message = format!("{}: {}", ctx, self.message);
        self
    }

    /// Re-classify the error, keeping message and exit code.
    pub fn reclassify(mut self, kind: CopyErrorKind) -> Self {
        self.kind = kind;
        self
    }

    // ── Convenience constructors ─────────────────────────────────

    pub fn session_creation(msg: impl Into<String>) -> Self {
        Self::new(CopyErrorKind::SessionCreation, msg)
    }

    pub fn source_read(msg: impl Into<String>) -> Self {
        Self::new(CopyErrorKind::SourceRead, msg)
    }

    pub fn transmit(msg: impl Into<String>) -> Self {
        Self::new(CopyErrorKind::Transmit, msg)
    }

    /// A remote command finished with a nonzero exit code.
    pub fn command_failed(operation: &str, code: i32) -> Self {
        Self::new(
            CopyErrorKind::CommandFailed,
            format!("{} operation returned code={}", operation, code),
        )
        .with_exit_code(code)
    }

    pub fn restore(msg: impl Into<String>) -> Self {
        Self::new(CopyErrorKind::Restore, msg)
    }

    pub fn cleanup(msg: impl Into<String>) -> Self {
        Self::new(CopyErrorKind::Cleanup, msg)
    }

    pub fn naming(msg: impl Into<String>) -> Self {
        Self::new(CopyErrorKind::Naming, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(CopyErrorKind::InvalidConfig, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CopyErrorKind::Io, msg)
    }

    pub fn is_directory_conflict(&self) -> bool {
        self.kind == CopyErrorKind::DestinationIsDirectory
    }
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "[{:?} code={}] {}", self.kind, code, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for CopyError {}

impl From<std::io::Error> for CopyError {
    fn from(e: std::io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<CopyError> for String {
    fn from(e: CopyError) -> String {
        e.message
    }
}
