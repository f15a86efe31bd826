//! Client entry point.

use crate::config::WinrmcpConfig;
use log::debug;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncRead;
use winrmcp_core::{copy_to, CopyError, CopyOptions, CopyResult, RemoteClient, TransferSummary};

/// Copies local data to one remote host.
#[derive(Clone)]
pub struct Winrmcp {
    client: Arc<dyn RemoteClient>,
    options: CopyOptions,
}

impl Winrmcp {
    pub fn new(client: Arc<dyn RemoteClient>, config: &WinrmcpConfig) -> Self {
        Self::with_options(client, config.copy_options())
    }

    pub fn with_options(client: Arc<dyn RemoteClient>, options: CopyOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// Copy the local file at `from_path` to `to_path` on the remote host.
    pub async fn copy(
        &self,
        from_path: impl AsRef<Path>,
        to_path: &str,
    ) -> CopyResult<TransferSummary> {
        let from_path = from_path.as_ref();
        let mut file = tokio::fs::File::open(from_path).await.map_err(|e| {
            CopyError::source_read(format!("Couldn't read file {}: {}", from_path.display(), e))
        })?;

        let metadata = file.metadata().await.map_err(|e| {
            CopyError::source_read(format!("Couldn't stat file {}: {}", from_path.display(), e))
        })?;
        if metadata.is_dir() {
            return Err(CopyError::invalid_config(format!(
                "Copying directories is not supported: {}",
                from_path.display()
            )));
        }

        debug!(
            "Copying {} ({} bytes) to {}",
            from_path.display(),
            metadata.len(),
            to_path
        );
        self.write(to_path, &mut file).await
    }

    /// Copy everything `reader` yields to `to_path` on the remote host.
    pub async fn write<R>(&self, to_path: &str, reader: &mut R) -> CopyResult<TransferSummary>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        copy_to(&*self.client, &self.options, reader, to_path).await
    }
}
