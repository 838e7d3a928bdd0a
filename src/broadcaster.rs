//! Broadcaster implementation
//!
//! Serializes every "send to everyone" request through one ordered
//! channel. A single consumer task takes a registry snapshot per message
//! and enqueues it onto every participant's mailbox, so all recipients
//! see broadcasts in publish order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::SendError;
use crate::registry::Registry;

/// Publishing handle for the broadcaster
#[derive(Debug, Clone)]
pub struct Broadcaster {
    sender: mpsc::Sender<String>,
}

impl Broadcaster {
    /// Start the consumer task over `registry`
    ///
    /// The task runs until every `Broadcaster` clone has been dropped.
    pub fn spawn(registry: Arc<Registry>, buffer: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(buffer);
        let fan_out = FanOut { registry, receiver };
        (Self { sender }, tokio::spawn(fan_out.run()))
    }

    /// Queue already-formatted text for everyone currently online
    pub async fn publish(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.sender
            .send(text.into())
            .await
            .map_err(|_| SendError::BroadcasterClosed)
    }
}

/// The broadcaster's consumer side
struct FanOut {
    registry: Arc<Registry>,
    receiver: mpsc::Receiver<String>,
}

impl FanOut {
    /// Run the fan-out loop
    ///
    /// Continuously receives and delivers messages until all publishers are dropped.
    async fn run(mut self) {
        info!("Broadcaster started");

        while let Some(text) = self.receiver.recv().await {
            self.fan_out(&text);
        }

        info!("Broadcaster shutting down");
    }

    fn fan_out(&self, text: &str) {
        let recipients = self.registry.snapshot();
        debug!("Broadcasting to {} participants: {}", recipients.len(), text);

        for participant in recipients {
            // A closed mailbox belongs to a session that is on its way out
            let _ = participant.send(text);
        }
    }
}
