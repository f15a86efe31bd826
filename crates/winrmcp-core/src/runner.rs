//! Synchronous execution of a single remote command.
//!
//! Every remote step of a transfer (stream setup, chunk appends, teardown,
//! restore, cleanup) goes through [`CommandRunner::run`]: submit, drain
//! stdout and stderr concurrently while waiting for completion, then turn a
//! nonzero exit code into an error.

use crate::error::{CopyError, CopyResult};
use crate::remote::{OutputStream, RemoteShell};
use log::{debug, trace};
use tokio::io::AsyncWrite;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Stdout,
    Stderr,
}

/// Runs remote commands one at a time.
#[derive(Debug, Clone, Copy)]
pub struct CommandRunner {
    /// Forward remote output to this process's stdout/stderr
    echo_output: bool,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self { echo_output: true }
    }
}

impl CommandRunner {
    pub fn new(echo_output: bool) -> Self {
        Self { echo_output }
    }

    pub fn echo_output(&self) -> bool {
        self.echo_output
    }

    /// Execute `command` in `shell` and wait for it to finish.
    ///
    /// `operation` names the step in the error returned for a nonzero exit.
    pub async fn run(
        &self,
        shell: &dyn RemoteShell,
        command: &str,
        operation: &str,
    ) -> CopyResult<()> {
        trace!("Running {} command ({} chars)", operation, command.len());

        let mut cmd = shell
            .execute(command)
            .await
            .map_err(|e| e.context(format!("Unable to submit {} command", operation)))?;

        let stdout = cmd.take_stdout();
        let stderr = cmd.take_stderr();

        let (out_bytes, err_bytes, waited) = tokio::join!(
            self.drain(stdout, Sink::Stdout),
            self.drain(stderr, Sink::Stderr),
            cmd.wait(),
        );

        if let Err(e) = cmd.close().await {
            debug!("Failed to close {} command: {}", operation, e);
        }
        waited.map_err(|e| e.context(format!("Waiting for {} command", operation)))?;

        let code = cmd.exit_code();
        trace!(
            "{} command finished: code={} stdout={}B stderr={}B",
            operation,
            code,
            out_bytes,
            err_bytes
        );

        if code != 0 {
            return Err(CopyError::command_failed(operation, code));
        }
        Ok(())
    }

    async fn drain(&self, stream: Option<OutputStream>, sink: Sink) -> u64 {
        let Some(mut stream) = stream else {
            return 0;
        };

        if !self.echo_output {
            return forward(&mut stream, &mut tokio::io::sink(), sink).await;
        }
        match sink {
            Sink::Stdout => forward(&mut stream, &mut tokio::io::stdout(), sink).await,
            Sink::Stderr => forward(&mut stream, &mut tokio::io::stderr(), sink).await,
        }
    }
}

/// Copy `stream` into `out`, which `tokio::io::copy` flushes at end-of-stream.
/// Returns the bytes forwarded, or 0 when writing or flushing failed.
async fn forward<W>(stream: &mut OutputStream, out: &mut W, sink: Sink) -> u64
where
    W: AsyncWrite + Unpin,
{
    match tokio::io::copy(stream, out).await {
        Ok(n) => n,
        Err(e) => {
            debug!("Failed to forward remote {:?}: {}", sink, e);
            0
        }
    }
}
