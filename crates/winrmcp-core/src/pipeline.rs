//! Producer/consumer pipeline feeding encoded chunks to a remote shell.
//!
//! The producer (the session loop) hands chunks to [`ChunkWriter::write`].
//! A consumer task owned by the writer turns each chunk into one synchronous
//! append command. The two sides share:
//!   • a bounded content channel (capacity 1), closed by the producer
//!   • a one-shot error slot, dropped by the consumer on every exit path
//!   • a cancellation token the consumer trips when an append fails
//!
//! The producer races every send against the token, so a failed append is
//! seen before the next chunk is queued.

use crate::error::{CopyError, CopyResult};
use crate::remote::RemoteShell;
use crate::runner::CommandRunner;
use crate::stream::RemoteStream;
use log::debug;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Producer half of the pipeline for one shell.
pub struct ChunkWriter {
    content_tx: Option<mpsc::Sender<String>>,
    error_rx: Option<oneshot::Receiver<CopyError>>,
    cancel: CancellationToken,
    consumer: JoinHandle<usize>,
    accepted: usize,
}

impl ChunkWriter {
    /// Start the consumer task. Nothing is sent to the remote host until the
    /// first chunk arrives.
    pub fn open(shell: Arc<dyn RemoteShell>, temp_path: impl Into<String>, runner: CommandRunner) -> Self {
        let (content_tx, content_rx) = mpsc::channel(1);
        let (error_tx, error_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let consumer = tokio::spawn(consume(
            shell,
            temp_path.into(),
            runner,
            content_rx,
            error_tx,
            cancel.clone(),
        ));

        Self {
            content_tx: Some(content_tx),
            error_rx: Some(error_rx),
            cancel,
            consumer,
            accepted: 0,
        }
    }

    /// Chunks handed to the consumer so far.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Queue one encoded chunk, or return the consumer's error if it failed.
    pub async fn write(&mut self, content: String) -> CopyResult<()> {
        let tx = match self.content_tx.as_ref() {
            Some(tx) => tx,
            None => return Err(CopyError::transmit("Chunk writer is already closed")),
        };

        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            res = tx.send(content) => res.is_ok(),
        };

        if sent {
            self.accepted += 1;
            Ok(())
        } else {
            self.content_tx = None;
            Err(self.take_error().await)
        }
    }

    /// Close the content channel, wait for the consumer to release its remote
    /// resources, and report an error raised by the last accepted chunk.
    pub async fn finish(mut self) -> CopyResult<usize> {
        self.content_tx = None;

        let written = (&mut self.consumer)
            .await
            .map_err(|e| CopyError::transmit(format!("Chunk writer task failed: {}", e)))?;

        if let Some(mut rx) = self.error_rx.take() {
            if let Ok(err) = rx.try_recv() {
                return Err(err);
            }
        }
        Ok(written)
    }

    /// Give up on remaining chunks and wait for the consumer to wind down.
    pub async fn abort(self) {
        self.cancel.cancel();
        if let Err(e) = self.finish().await {
            debug!("Chunk writer aborted with pending error: {}", e);
        }
    }

    async fn take_error(&mut self) -> CopyError {
        match self.error_rx.take() {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                CopyError::transmit("Chunk writer stopped without reporting an error")
            }),
            None => CopyError::transmit("Chunk writer has already failed"),
        }
    }
}

/// Consumer loop: one append command per received chunk.
async fn consume(
    shell: Arc<dyn RemoteShell>,
    temp_path: String,
    runner: CommandRunner,
    mut content_rx: mpsc::Receiver<String>,
    error_tx: oneshot::Sender<CopyError>,
    cancel: CancellationToken,
) -> usize {
    let mut stream: Option<RemoteStream> = None;
    let mut written = 0;
    let mut failure = None;

    loop {
        let content = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = content_rx.recv() => match next {
                Some(content) => content,
                None => break,
            },
        };

        if stream.is_none() {
            match RemoteStream::open(&*shell, &runner, &temp_path).await {
                Ok(s) => stream = Some(s),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(s) = stream.as_ref() {
            if let Err(e) = s.write(&*shell, &runner, &content).await {
                failure = Some(e);
                break;
            }
        }
        written += 1;
    }

    if let Some(err) = failure {
        // Report before teardown so the producer stops queueing right away.
        let _ = error_tx.send(err);
        cancel.cancel();
    } else {
        drop(error_tx);
    }
    content_rx.close();

    if let Some(s) = stream {
        let failed = s.release(&*shell, &runner).await;
        if failed > 0 {
            debug!("{} teardown step(s) failed for {}", failed, temp_path);
        }
    }

    written
}
