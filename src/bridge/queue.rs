//! Ingest queue
//!
//! The only crossing point between the MQTT driver task and the dispatcher
//! task: a bounded multi-producer, single-consumer FIFO. Producers never
//! wait; when the queue is full the message is dropped and counted. The
//! consumer awaits the next message instead of polling on a timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::broker::InboundMessage;
use crate::utils::{BridgeError, Result};

pub fn channel(capacity: usize) -> (IngestSender, IngestReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        IngestSender {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        IngestReceiver { rx },
    )
}

#[derive(Debug, Clone)]
pub struct IngestSender {
    tx: mpsc::Sender<InboundMessage>,
    dropped: Arc<AtomicU64>,
}

impl IngestSender {
    pub fn push(&self, msg: InboundMessage) -> Result<()> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(msg) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                BridgeError::ResourceExhausted(format!(
                    "ingest queue full, dropped message on {} ({dropped} dropped so far)",
                    msg.topic
                ))
            }
            TrySendError::Closed(_) => BridgeError::Transport("dispatcher has stopped".into()),
        })
    }

    /// Messages rejected because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct IngestReceiver {
    rx: mpsc::Receiver<InboundMessage>,
}

impl IngestReceiver {
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<InboundMessage> {
        self.rx.try_recv().ok()
    }

    /// Stops new pushes; anything already queued can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
