//! Registry of connected participants
//!
//! Maps display name to participant under a single lock. Every operation
//! is one short critical section over the in-memory map; nothing here
//! awaits or does I/O while the lock is held.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::RegistryError;
use crate::participant::Participant;
use crate::types::ParticipantId;

/// One `who` result: address and current name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub addr: String,
    pub name: String,
}

/// Shared name → participant roster
#[derive(Debug, Default)]
pub struct Registry {
    members: Mutex<HashMap<String, Participant>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `participant` under `name`
    ///
    /// Check and insert happen in one critical section; an existing entry
    /// is never overwritten.
    pub fn join(&self, name: &str, participant: Participant) -> Result<(), RegistryError> {
        let mut members = self.members.lock();
        if members.contains_key(name) {
            return Err(RegistryError::NameTaken(name.to_string()));
        }
        members.insert(name.to_string(), participant);
        debug!("Registry: {} joined, {} online", name, members.len());
        Ok(())
    }

    /// Remove `name` if it still belongs to participant `id`
    ///
    /// Returns true if an entry was removed; no-op if absent.
    pub fn leave(&self, name: &str, id: ParticipantId) -> bool {
        let mut members = self.members.lock();
        match members.get(name) {
            Some(p) if p.id == id => {
                members.remove(name);
                debug!("Registry: {} left, {} online", name, members.len());
                true
            }
            _ => false,
        }
    }

    /// Move participant `id` from `old_name` to `new_name`
    ///
    /// The availability check and the move are a single critical section,
    /// so two concurrent renames to the same name cannot both succeed.
    /// On failure the registry is unchanged.
    pub fn rename(
        &self,
        old_name: &str,
        new_name: &str,
        id: ParticipantId,
    ) -> Result<(), RegistryError> {
        let mut members = self.members.lock();

        if members.contains_key(new_name) {
            return Err(RegistryError::NameTaken(new_name.to_string()));
        }

        match members.get(old_name) {
            Some(p) if p.id == id => {}
            _ => return Err(RegistryError::NotRegistered(old_name.to_string())),
        }

        if let Some(participant) = members.remove(old_name) {
            members.insert(new_name.to_string(), participant);
        }
        debug!("Registry: {} renamed to {}", old_name, new_name);
        Ok(())
    }

    /// Look up a participant by name
    pub fn lookup(&self, name: &str) -> Option<Participant> {
        self.members.lock().get(name).cloned()
    }

    /// Copy of every current participant, for fan-out
    pub fn snapshot(&self) -> Vec<Participant> {
        self.members.lock().values().cloned().collect()
    }

    /// Current names and addresses, for `who`
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.members
            .lock()
            .iter()
            .map(|(name, p)| RosterEntry {
                addr: p.addr.clone(),
                name: name.clone(),
            })
            .collect()
    }

    /// Check if a name is in use
    pub fn contains(&self, name: &str) -> bool {
        self.members.lock().contains_key(name)
    }

    /// Number of registered participants
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Check if nobody is registered
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }
}
