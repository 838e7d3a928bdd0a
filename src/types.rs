//! Participant identity independent of the display name.

use std::fmt;

use uuid::Uuid;

/// Stable id for one connection's participant.
///
/// Names move with `rename|`; registry `leave`/`rename` compare this id so a
/// session can only touch the entry it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
