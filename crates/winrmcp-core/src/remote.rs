// ── Remote execution capability ──────────────────────────────────────────────
//
// The transfer never talks to a transport directly. Whatever carries the
// commands (WinRM, an SSH-hosted PowerShell, a test double) implements these
// three traits: a client that opens shells, a shell that runs commands, and a
// command whose output streams and exit code can be collected.

use crate::error::CopyResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncRead;

/// Byte stream of a remote command's stdout or stderr.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Opens remote execution contexts.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn create_shell(&self) -> CopyResult<Arc<dyn RemoteShell>>;
}

/// One remote execution context. Variables assigned by a command stay
/// visible to later commands in the same shell.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Submit a command; it runs until [`RemoteCommand::wait`] reports completion.
    async fn execute(&self, command: &str) -> CopyResult<Box<dyn RemoteCommand>>;

    /// Release the shell on the remote host.
    async fn close(&self) -> CopyResult<()>;
}

/// A submitted command.
#[async_trait]
pub trait RemoteCommand: Send {
    /// Take the stdout stream. Returns `None` once taken.
    fn take_stdout(&mut self) -> Option<OutputStream>;

    /// Take the stderr stream. Returns `None` once taken.
    fn take_stderr(&mut self) -> Option<OutputStream>;

    /// Wait for the command to finish.
    async fn wait(&mut self) -> CopyResult<()>;

    /// Exit code; only meaningful after [`RemoteCommand::wait`].
    fn exit_code(&self) -> i32;

    /// Release the command on the remote host.
    async fn close(&mut self) -> CopyResult<()> {
        Ok(())
    }
}
