//! Per-participant outbound queue and delivery task
//!
//! A `Mailbox` is the cloneable producer side (broadcaster, directed
//! senders and the owning session all enqueue). The delivery task is the
//! single consumer: it writes each queued line to the participant's
//! outbound stream, newline-terminated, until the queue closes, a write
//! fails, or the session cancels it.

use futures_util::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SendError;

/// Consumer side of a mailbox
pub type MailboxReceiver = mpsc::UnboundedReceiver<String>;

/// Producer handle for one participant's outbound queue
///
/// Unbounded so that enqueueing never suspends, which lets the broadcaster
/// fan out without waiting on any single slow peer.
#[derive(Debug, Clone)]
pub struct Mailbox {
    sender: mpsc::UnboundedSender<String>,
}

impl Mailbox {
    /// Create a mailbox and the receiver its delivery task will drain
    pub fn channel() -> (Self, MailboxReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Enqueue one line (without terminator)
    ///
    /// Returns an error if the delivery task has ended.
    pub fn deliver(&self, line: impl Into<String>) -> Result<(), SendError> {
        self.sender
            .send(line.into())
            .map_err(|_| SendError::MailboxClosed)
    }

    /// Whether the delivery task has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Create a mailbox for `writer` and spawn its delivery task
///
/// The task stops when `cancel` fires (even mid-write), when every
/// `Mailbox` clone has been dropped and the queue is drained, or on the
/// first write failure.
pub fn spawn<W>(writer: W, peer: String, cancel: CancellationToken) -> (Mailbox, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (mailbox, receiver) = Mailbox::channel();

    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Delivery task for {} cancelled", peer);
            }
            _ = drain(writer, receiver, &peer) => {}
        }
    });

    (mailbox, handle)
}

async fn drain<W>(writer: W, mut receiver: MailboxReceiver, peer: &str)
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    while let Some(line) = receiver.recv().await {
        if let Err(e) = sink.send(line).await {
            debug!("Write to {} failed, ending delivery task: {}", peer, e);
            return;
        }
    }

    debug!("Mailbox for {} closed", peer);
}
