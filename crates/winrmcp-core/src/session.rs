//! Session-bounded upload loop.
//!
//! Remote shells degrade when a single one carries too many commands, so
//! the upload opens a shell, writes at most `max_operations_per_shell`
//! chunks through it, closes it, and repeats until the source is drained.

use crate::chunk::{checked_chunk_size, encode_chunk, read_chunk};
use crate::error::{CopyError, CopyResult};
use crate::pipeline::ChunkWriter;
use crate::remote::{RemoteClient, RemoteShell};
use crate::runner::CommandRunner;
use crate::types::{CopyOptions, UploadStats};
use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::io::AsyncRead;

/// Outcome of one shell's worth of chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub chunks: usize,
    pub bytes: u64,
    /// The source reported end-of-stream during this session.
    pub exhausted: bool,
}

/// Open a shell, run `body` against it, and close the shell whatever the
/// outcome. Close failures are logged, never returned.
pub async fn with_shell<T, F, Fut>(client: &dyn RemoteClient, body: F) -> CopyResult<T>
where
    F: FnOnce(Arc<dyn RemoteShell>) -> Fut,
    Fut: Future<Output = CopyResult<T>>,
{
    let shell = client
        .create_shell()
        .await
        .map_err(|e| CopyError::session_creation(format!("Couldn't create shell: {}", e.message)))?;

    let result = body(shell.clone()).await;

    if let Err(e) = shell.close().await {
        warn!("Failed to close remote shell: {}", e);
    }
    result
}

/// Upload `reader` to `temp_path`, rotating shells as the budget runs out.
pub async fn upload_content<R>(
    client: &dyn RemoteClient,
    options: &CopyOptions,
    temp_path: &str,
    reader: &mut R,
) -> CopyResult<UploadStats>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let chunk_size = checked_chunk_size(options.command_length_limit(), temp_path)?;
    let runner = CommandRunner::new(options.echo_remote_output);
    let mut buf = vec![0u8; chunk_size];
    let mut stats = UploadStats::default();

    loop {
        let outcome = upload_chunks(client, &runner, options, temp_path, reader, &mut buf).await?;
        debug!(
            "Shell {} wrote {} chunk(s), {} bytes",
            stats.chunks_per_session.len() + 1,
            outcome.chunks,
            outcome.bytes
        );
        stats.bytes += outcome.bytes;
        stats.chunks_per_session.push(outcome.chunks);
        if outcome.exhausted {
            return Ok(stats);
        }
    }
}

/// Write up to one shell's budget of chunks.
pub async fn upload_chunks<R>(
    client: &dyn RemoteClient,
    runner: &CommandRunner,
    options: &CopyOptions,
    temp_path: &str,
    reader: &mut R,
    buf: &mut [u8],
) -> CopyResult<SessionOutcome>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let max_chunks = options.effective_chunks_per_shell();

    with_shell(client, |shell| async move {
        let mut writer = ChunkWriter::open(shell, temp_path, *runner);
        let mut outcome = SessionOutcome {
            chunks: 0,
            bytes: 0,
            exhausted: false,
        };

        for _ in 0..max_chunks {
            let n = match read_chunk(reader, buf).await {
                Ok(n) => n,
                Err(e) => {
                    writer.abort().await;
                    return Err(CopyError::source_read(format!(
                        "Error reading source: {}",
                        e
                    )));
                }
            };
            if n == 0 {
                outcome.exhausted = true;
                break;
            }

            if let Err(e) = writer.write(encode_chunk(&buf[..n])).await {
                writer.abort().await;
                return Err(e);
            }
            outcome.chunks += 1;
            outcome.bytes += n as u64;
        }

        writer.finish().await?;
        Ok(outcome)
    })
    .await
}
