//! Whole-file copy: upload into a temp file, restore it into place, clean up.

use crate::error::CopyResult;
use crate::naming::temp_file_name;
use crate::remote::RemoteClient;
use crate::restore::{cleanup_content, restore_content};
use crate::runner::CommandRunner;
use crate::session::upload_content;
use crate::types::{CopyOptions, TransferSummary, REMOTE_TEMP_DIR};
use chrono::Utc;
use log::{log, Level};
use tokio::io::AsyncRead;

/// Copy everything `reader` yields to `to_path` on the remote host.
///
/// The temp file is left behind if the upload or restore fails.
pub async fn copy_to<R>(
    client: &dyn RemoteClient,
    options: &CopyOptions,
    reader: &mut R,
    to_path: &str,
) -> CopyResult<TransferSummary>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let started_at = Utc::now();
    let level = if options.verbose { Level::Info } else { Level::Debug };
    let runner = CommandRunner::new(options.echo_remote_output);

    let temp_file = temp_file_name()
        .map_err(|e| e.context("Error generating unique filename"))?;
    let temp_path = format!("{}\\{}", REMOTE_TEMP_DIR, temp_file);

    log!(level, "Copying file to {}", temp_path);
    let stats = upload_content(client, options, &temp_path, reader)
        .await
        .map_err(|e| e.context(format!("Error uploading file to {}", temp_path)))?;

    log!(level, "Moving file from {} to {}", temp_path, to_path);
    restore_content(client, &runner, &temp_path, to_path)
        .await
        .map_err(|e| {
            e.context(format!(
                "Error restoring file from {} to {}",
                temp_path, to_path
            ))
        })?;

    log!(level, "Removing temporary file {}", temp_path);
    cleanup_content(client, &runner, &temp_path)
        .await
        .map_err(|e| e.context(format!("Error removing temporary file {}", temp_path)))?;

    let duration_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
    let summary = TransferSummary {
        temp_path,
        destination_path: to_path.to_string(),
        bytes_transferred: stats.bytes,
        chunks_per_session: stats.chunks_per_session,
        started_at,
        duration_ms,
    };
    log!(
        level,
        "Copied {} bytes to {} in {} shell(s), {}ms",
        summary.bytes_transferred,
        summary.destination_path,
        summary.sessions(),
        summary.duration_ms
    );
    Ok(summary)
}
