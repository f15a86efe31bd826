//! Remote stream writer bound to a PowerShell variable.
//!
//! The writer lives inside one shell. It is created by [`RemoteStream::open`]
//! and must be handed back through [`RemoteStream::release`] before the shell
//! goes away.

use crate::error::{CopyErrorKind, CopyResult};
use crate::naming::{temp_variable, STREAM_VARIABLE_PREFIX};
use crate::remote::RemoteShell;
use crate::runner::CommandRunner;
use crate::scripts::v1;
use log::{debug, warn};

/// Operation name reported for append-phase command failures.
pub const UPLOAD_OPERATION: &str = "upload";

#[derive(Debug)]
pub struct RemoteStream {
    variable: String,
    path: String,
}

impl RemoteStream {
    /// Create a stream writer appending to `path` under a fresh variable name.
    pub async fn open(
        shell: &dyn RemoteShell,
        runner: &CommandRunner,
        path: &str,
    ) -> CopyResult<Self> {
        let variable = temp_variable(STREAM_VARIABLE_PREFIX)?;
        runner
            .run(shell, &v1::open_stream(&variable, path), UPLOAD_OPERATION)
            .await
            .map_err(|e| {
                e.reclassify(CopyErrorKind::Transmit)
                    .context(format!("Unable to open stream for temporary file {}", path))
            })?;
        debug!("Opened remote stream ${} for {}", variable, path);

        Ok(Self {
            variable,
            path: path.to_string(),
        })
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Append one encoded chunk as a line.
    pub async fn write(
        &self,
        shell: &dyn RemoteShell,
        runner: &CommandRunner,
        content: &str,
    ) -> CopyResult<()> {
        runner
            .run(shell, &v1::write_line(&self.variable, content), UPLOAD_OPERATION)
            .await
            .map_err(|e| {
                e.reclassify(CopyErrorKind::Transmit).context(format!(
                    "Error writing to stream for temporary file {}",
                    self.path
                ))
            })
    }

    /// Close and dispose the writer, then drop its variable.
    ///
    /// Every step is attempted even if an earlier one failed. Failures are
    /// logged; the count of failed steps is returned.
    pub async fn release(self, shell: &dyn RemoteShell, runner: &CommandRunner) -> usize {
        let steps = [
            ("closing stream", v1::close_stream(&self.variable)),
            ("releasing stream", v1::dispose_stream(&self.variable)),
            ("removing variable", v1::remove_variable(&self.variable)),
        ];

        let mut failures = 0;
        for (what, command) in steps.iter() {
            if let Err(e) = runner.run(shell, command, UPLOAD_OPERATION).await {
                warn!(
                    "Error {} ${} for temporary file {}: {}",
                    what, self.variable, self.path, e
                );
                failures += 1;
            }
        }
        failures
    }
}
