//! Error types for the chat broker
//!
//! Session-fatal errors, queue send errors, roster conflicts and
//! protocol errors that are reported back to the offending sender.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Session-level errors
///
/// Any of these ends the affected session only. Other sessions, the
/// registry and the broadcaster keep running.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - broadcaster consumer is gone)
    #[error("Channel send error")]
    ChannelSend,
}

impl From<SendError> for BrokerError {
    fn from(_: SendError) -> Self {
        BrokerError::ChannelSend
    }
}

/// Message send errors
///
/// Occurs when attempting to enqueue onto a queue whose consumer has ended.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The participant's delivery task has terminated
    #[error("Mailbox closed")]
    MailboxClosed,

    /// The broadcaster consumer has terminated
    #[error("Broadcaster closed")]
    BroadcasterClosed,
}

/// Roster errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Another live participant already uses this name
    #[error("Name already taken: {0}")]
    NameTaken(String),

    /// The name is not registered to the calling participant
    #[error("Not registered: {0}")]
    NotRegistered(String),
}

/// Protocol errors for a single command line
///
/// Never fatal; converted to a reply for the sender (see `message::Reply`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Rename target is already in use
    #[error("Name already taken")]
    NameTaken,

    /// Directed message without a recipient name
    #[error("Missing recipient")]
    MissingRecipient,

    /// Directed message to a name nobody holds
    #[error("Unknown recipient")]
    UnknownRecipient,

    /// Directed message without content
    #[error("Empty content")]
    EmptyContent,
}
