//! Participant struct definition
//!
//! Represents a connected chat identity as stored in the registry.

use crate::error::SendError;
use crate::mailbox::Mailbox;
use crate::types::ParticipantId;

/// Connected participant information
///
/// The display name is the registry key and is not stored here; the
/// address is captured at connection time and never changes.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Unique identifier for this participant
    pub id: ParticipantId,
    /// Transport-level peer address
    pub addr: String,
    /// Handle to this participant's outbound queue
    pub mailbox: Mailbox,
}

impl Participant {
    /// Create a new participant with a fresh ID
    pub fn new(addr: impl Into<String>, mailbox: Mailbox) -> Self {
        Self {
            id: ParticipantId::new(),
            addr: addr.into(),
            mailbox,
        }
    }

    /// Send a line to this participant
    ///
    /// Returns an error if the delivery task has ended.
    pub fn send(&self, line: impl Into<String>) -> Result<(), SendError> {
        self.mailbox.deliver(line)
    }
}
