//! Drains the match queue into stdout, the output log and the notifiers.

use crate::core::{MatchLine, Notifier};
use crate::error::ConfigError;
use crate::sink::MatchReceiver;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

/// Append-only output file, truncated when opened.
#[derive(Debug)]
pub struct OutputLog {
    path: PathBuf,
    file: tokio::fs::File,
}

impl OutputLog {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let file = std::fs::File::create(&path).map_err(|source| ConfigError::OutputNotWritable {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            file: tokio::fs::File::from_std(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `line` plus a newline and flushes before returning.
    pub async fn append(&mut self, line: &str) -> std::io::Result<()> {
        self.file.write_all(format!("{line}\n").as_bytes()).await?;
        self.file.flush().await
    }
}

/// Consumes the match queue until shutdown or until every sender is gone.
pub struct DeliveryWorker {
    rx: MatchReceiver,
    log: OutputLog,
    notifiers: Vec<Arc<dyn Notifier>>,
    echo: bool,
    delivered: u64,
    notify_failures: u64,
}

impl DeliveryWorker {
    pub fn new(rx: MatchReceiver, log: OutputLog, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self {
            rx,
            log,
            notifiers,
            echo: true,
            delivered: 0,
            notify_failures: 0,
        }
    }

    /// Whether each line is also printed to stdout. On by default.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Delivers lines until every sender is gone.
    ///
    /// A shutdown signal does not stop the worker: it stops notifying and
    /// writes the remaining lines to the output file only, until the stream
    /// listener drops its sender and the queue is empty.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            output = %self.log.path().display(),
            notifiers = self.notifiers.len(),
            "Delivery worker started."
        );

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Delivery worker received shutdown signal, writing remaining matches to file.");
                    break;
                }
                next = self.rx.recv() => next,
            };

            match next {
                Some(line) => self.deliver(&line).await,
                None => {
                    info!("Match queue closed, delivery worker shutting down.");
                    break;
                }
            }
        }

        self.drain().await;
        info!(
            delivered = self.delivered,
            notify_failures = self.notify_failures,
            "Delivery worker finished."
        );
    }

    /// Writes the line locally, then hands it to every notifier at once so a
    /// slow or failing sink does not hold up the others.
    async fn deliver(&mut self, line: &MatchLine) {
        self.write_line(line).await;

        if self.notifiers.is_empty() {
            return;
        }

        let results = join_all(
            self.notifiers
                .iter()
                .map(|notifier| async move { (notifier.name(), notifier.notify(line).await) }),
        )
        .await;

        for (sink, result) in results {
            match result {
                Ok(()) => debug!(sink, domain = line.domain(), "Notification delivered"),
                Err(e) => {
                    self.notify_failures += 1;
                    error!(sink, domain = line.domain(), error = %e, "Failed to deliver notification");
                }
            }
        }
    }

    async fn write_line(&mut self, line: &MatchLine) {
        let rendered = line.to_string();
        if self.echo {
            println!("{rendered}");
        }
        if let Err(e) = self.log.append(&rendered).await {
            error!(path = %self.log.path().display(), error = %e, "Failed to write match to output file");
        }
        self.delivered += 1;
    }

    /// Writes every remaining line to the output file until the queue is
    /// closed and empty. Notifiers are skipped so shutdown is not held up by
    /// the network.
    async fn drain(&mut self) {
        let mut drained = 0usize;
        while let Some(line) = self.rx.recv().await {
            self.write_line(&line).await;
            drained += 1;
        }
        if drained > 0 {
            info!(drained, "Wrote queued matches to output file during shutdown.");
        }
    }
}
