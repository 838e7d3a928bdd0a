//! Per-connection session
//!
//! Owns one participant's identity and inbound read loop. Each line is
//! classified and drives the registry, the broadcaster or a single
//! mailbox. The outbound side is the participant's mailbox delivery task.
//! On a clean close the session lets it drain; on a read failure, or if
//! draining stalls, it is cancelled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, BufReader, ReadHalf};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcaster::Broadcaster;
use crate::error::{BrokerError, CommandError, RegistryError};
use crate::mailbox::{self, Mailbox};
use crate::message::{self, Command, Reply, DROPPED, MAX_LINE_LENGTH, OFFLINE, ONLINE};
use crate::participant::Participant;
use crate::registry::Registry;
use crate::types::ParticipantId;

/// How long queued replies may take to reach a departing peer
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Why the read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Departure {
    /// Peer closed the stream
    Closed,
    /// Read failed or the line limit was exceeded
    Dropped,
}

/// Handle a newly accepted stream
///
/// `addr` is the peer address; it is also the initial display name.
/// Returns when the peer disconnects. Errors only concern this session.
pub async fn handle_connection<S>(
    stream: S,
    addr: String,
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
) -> Result<(), BrokerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);

    let cancel = CancellationToken::new();
    let (mailbox, delivery) = mailbox::spawn(writer, addr.clone(), cancel.clone());
    let participant = Participant::new(addr.clone(), mailbox.clone());
    let id = participant.id;

    if let Err(e) = registry.join(&addr, participant) {
        warn!("Rejecting {}: {}", addr, e);
        let _ = mailbox.deliver(Reply::NameTaken.to_string());
        drop(mailbox);
        finish_delivery(delivery, cancel, Departure::Closed, &addr).await;
        return Ok(());
    }

    info!("{} joined", addr);

    let mut session = Session {
        id,
        name: addr.clone(),
        addr: addr.clone(),
        reader: BufReader::new(reader),
        registry,
        broadcaster,
        mailbox,
    };

    let (departure, result) = session.run().await;

    // Releases the last long-lived Mailbox handle so the queue can close
    drop(session);
    finish_delivery(delivery, cancel, departure, &addr).await;

    result
}

/// Wait for the delivery task to end
///
/// After a clean close the task drains whatever is queued, bounded by
/// `DRAIN_TIMEOUT`. After a failure it is cancelled right away.
async fn finish_delivery(
    mut delivery: JoinHandle<()>,
    cancel: CancellationToken,
    departure: Departure,
    peer: &str,
) {
    if departure == Departure::Closed {
        if timeout(DRAIN_TIMEOUT, &mut delivery).await.is_ok() {
            return;
        }
        debug!("Delivery to {} did not drain in time", peer);
    }

    cancel.cancel();
    let _ = delivery.await;
}

/// State of one live session
struct Session<S> {
    id: ParticipantId,
    addr: String,
    name: String,
    reader: BufReader<ReadHalf<S>>,
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
    mailbox: Mailbox,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn run(&mut self) -> (Departure, Result<(), BrokerError>) {
        let result = self.read_loop().await;

        // Leave even if the broadcaster failed mid-session
        let departure = match &result {
            Ok(departure) => *departure,
            Err(_) => Departure::Dropped,
        };
        let left = self.leave(departure).await;

        (departure, result.and(left))
    }

    async fn read_loop(&mut self) -> Result<Departure, BrokerError> {
        self.publish(ONLINE).await?;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = {
                let mut limited = (&mut self.reader).take(MAX_LINE_LENGTH as u64);
                limited.read_until(b'\n', &mut buf).await
            };
            match read {
                Ok(0) => {
                    debug!("{} closed the stream", self.name);
                    return Ok(Departure::Closed);
                }
                Ok(n) if n == MAX_LINE_LENGTH && !buf.ends_with(b"\n") => {
                    warn!(
                        "{} sent more than {} bytes without a newline",
                        self.addr, MAX_LINE_LENGTH
                    );
                    return Ok(Departure::Dropped);
                }
                Ok(_) => {
                    let line = message::decode_line(&buf);
                    self.handle_line(&line).await?;
                }
                Err(e) => {
                    warn!("Read error from {}: {}", self.addr, e);
                    return Ok(Departure::Dropped);
                }
            }
        }
    }

    async fn leave(&mut self, departure: Departure) -> Result<(), BrokerError> {
        self.registry.leave(&self.name, self.id);
        info!("{} ({}) left", self.name, self.addr);

        let body = match departure {
            Departure::Closed => OFFLINE,
            Departure::Dropped => DROPPED,
        };
        self.publish(body).await
    }

    /// Interpret one inbound line
    async fn handle_line(&mut self, line: &str) -> Result<(), BrokerError> {
        debug!("{} sent: {}", self.name, line);

        match Command::parse(line) {
            Command::Who => self.handle_who(),
            Command::Rename { new_name } => {
                if let Err(e) = self.handle_rename(new_name) {
                    self.reply(e.into());
                }
            }
            Command::Direct { target, content } => {
                if let Err(e) = self.handle_direct(target, content) {
                    self.reply(e.into());
                }
            }
            Command::Chat(text) => self.publish(text).await?,
        }

        Ok(())
    }

    fn handle_who(&self) {
        for entry in self.registry.roster() {
            self.reply(Reply::RosterEntry {
                addr: entry.addr,
                name: entry.name,
            });
        }
    }

    fn handle_rename(&mut self, new_name: &str) -> Result<(), CommandError> {
        match self.registry.rename(&self.name, new_name, self.id) {
            Ok(()) => {}
            Err(RegistryError::NameTaken(_)) => return Err(CommandError::NameTaken),
            Err(RegistryError::NotRegistered(name)) => {
                warn!("{} is not registered under '{}', ignoring rename", self.addr, name);
                return Ok(());
            }
        }

        info!("{} renamed to {}", self.name, new_name);
        self.name = new_name.to_string();
        self.reply(Reply::Renamed {
            name: self.name.clone(),
        });
        Ok(())
    }

    fn handle_direct(&self, target: &str, content: &str) -> Result<(), CommandError> {
        message::check_recipient(target)?;

        let recipient = self
            .registry
            .lookup(target)
            .ok_or(CommandError::UnknownRecipient)?;

        message::check_content(content)?;

        let _ = recipient.send(
            Reply::Whisper {
                from: self.name.clone(),
                content: content.to_string(),
            }
            .to_string(),
        );
        Ok(())
    }

    /// Send a line to this session's own participant only
    fn reply(&self, reply: Reply) {
        let _ = self.mailbox.deliver(reply.to_string());
    }

    /// Broadcast `[addr]name:body` to everyone online
    ///
    /// The returned future owns everything it needs and does not borrow
    /// the session.
    fn publish(
        &self,
        body: &str,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send + 'static {
        let text = message::stamped(&self.addr, &self.name, body);
        let broadcaster = self.broadcaster.clone();
        async move {
            broadcaster.publish(text).await?;
            Ok(())
        }
    }
}
