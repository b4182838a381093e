//! The bounded queue between the matcher and the delivery worker.
//!
//! Sending waits while the queue is full, so a slow sink slows down stream
//! ingestion instead of losing matches.

use crate::core::MatchLine;
use async_channel::{Receiver, Sender};
use thiserror::Error;

/// Default number of lines the queue holds before senders start waiting.
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Error, Debug)]
#[error("match queue is closed")]
pub struct SinkClosed(pub MatchLine);

/// Creates a bounded FIFO match queue.
pub fn match_channel(capacity: usize) -> (MatchSender, MatchReceiver) {
    let (tx, rx) = async_channel::bounded(capacity.max(1));
    (MatchSender { tx }, MatchReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct MatchSender {
    tx: Sender<MatchLine>,
}

impl MatchSender {
    /// Enqueues a line, waiting for room if the queue is full.
    ///
    /// Fails only when every receiver is gone; the line is handed back.
    pub async fn send(&self, line: MatchLine) -> Result<(), SinkClosed> {
        self.tx.send(line).await.map_err(|e| SinkClosed(e.into_inner()))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug, Clone)]
pub struct MatchReceiver {
    rx: Receiver<MatchLine>,
}

impl MatchReceiver {
    /// Waits for the next line. Returns `None` once every sender is dropped
    /// and the queue is drained.
    pub async fn recv(&self) -> Option<MatchLine> {
        self.rx.recv().await.ok()
    }

    /// Takes a line if one is ready.
    pub fn try_recv(&self) -> Option<MatchLine> {
        self.rx.try_recv().ok()
    }
}
