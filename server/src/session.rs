//! Player slot assignment and the readiness gate
//!
//! The registry holds at most two participants. A join takes slot one if it
//! is free, otherwise slot two, otherwise it is rejected. Readiness is a
//! per-slot flag, so it disappears together with the participant.

use crate::error::SessionError;
use log::info;
use shared::Slot;

/// Opaque identifier handed out by the transport for each connection
pub type ConnectionId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection: ConnectionId,
    pub ready: bool,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    slots: [Option<Participant>; 2],
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seats a connection in the lowest free slot.
    ///
    /// A connection that is already seated gets its existing slot back.
    pub fn join(&mut self, connection: ConnectionId) -> Result<Slot, SessionError> {
        if let Some(slot) = self.slot_of(connection) {
            return Ok(slot);
        }

        let slot = Slot::ALL
            .into_iter()
            .find(|slot| self.slots[slot.index()].is_none())
            .ok_or(SessionError::Full)?;

        self.slots[slot.index()] = Some(Participant {
            connection,
            ready: false,
        });
        info!("Connection {} seated in slot {}", connection, slot.number());
        Ok(slot)
    }

    /// Vacates the slot held by `connection`, dropping its readiness.
    /// Returns the slot that was freed, or None if the connection held none.
    pub fn leave(&mut self, connection: ConnectionId) -> Option<Slot> {
        let slot = self.slot_of(connection)?;
        self.slots[slot.index()] = None;
        info!("Connection {} left slot {}", connection, slot.number());
        Some(slot)
    }

    /// Marks the participant ready. Returns true if this changed anything.
    pub fn set_ready(&mut self, connection: ConnectionId) -> Result<bool, SessionError> {
        let participant = self
            .slots
            .iter_mut()
            .flatten()
            .find(|p| p.connection == connection)
            .ok_or(SessionError::UnknownConnection(connection))?;

        let changed = !participant.ready;
        participant.ready = true;
        Ok(changed)
    }

    pub fn clear_readiness(&mut self) {
        for participant in self.slots.iter_mut().flatten() {
            participant.ready = false;
        }
    }

    pub fn slot_of(&self, connection: ConnectionId) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| {
            self.slots[slot.index()]
                .as_ref()
                .is_some_and(|p| p.connection == connection)
        })
    }

    pub fn participant(&self, slot: Slot) -> Option<&Participant> {
        self.slots[slot.index()].as_ref()
    }

    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.slots.iter().flatten().map(|p| p.connection)
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn both_ready(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| slot.as_ref().is_some_and(|p| p.ready))
    }

    pub fn player_count(&self) -> u32 {
        self.slots.iter().flatten().count() as u32
    }

    pub fn ready_count(&self) -> u32 {
        self.slots.iter().flatten().filter(|p| p.ready).count() as u32
    }
}
