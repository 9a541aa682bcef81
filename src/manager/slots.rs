//! Player slots and the identity map of running drivers.

use super::driver::ActiveDriver;
use crate::protocol::constants::MAX_PLAYERS;
use crate::usb::DeviceIdentity;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Fixed pool of player slots.
///
/// Slots are handed out lowest-first; player number = slot + 1.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SlotTable {
    occupied: [bool; MAX_PLAYERS],
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the lowest free slot.
    ///
    /// # Examples
    ///
    /// ```
    /// use procon_bridge::manager::SlotTable;
    ///
    /// let mut slots = SlotTable::new();
    /// assert_eq!(slots.reserve(), Some(0));
    /// assert_eq!(slots.reserve(), Some(1));
    /// slots.release(0);
    /// assert_eq!(slots.reserve(), Some(0));
    /// ```
    pub fn reserve(&mut self) -> Option<usize> {
        let slot = self.occupied.iter().position(|taken| !taken)?;
        self.occupied[slot] = true;
        Some(slot)
    }

    /// Frees `slot`. Returns false if it was already free or out of range.
    pub fn release(&mut self, slot: usize) -> bool {
        match self.occupied.get_mut(slot) {
            Some(taken) if *taken => {
                *taken = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        self.occupied.get(slot).copied().unwrap_or(false)
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied.iter().filter(|taken| **taken).count()
    }
}

/// Outcome of trying to reserve a slot for a discovered device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reservation {
    Slot(usize),
    AlreadyTracked,
    Exhausted,
    Closed,
}

/// All shared bookkeeping of the device manager.
///
/// Only ever touched under its mutex, and never across an await.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub(crate) slots: SlotTable,
    pub(crate) drivers: HashMap<DeviceIdentity, ActiveDriver>,
    pub(crate) closed: bool,
}

impl Registry {
    pub(crate) fn reserve(&mut self, identity: DeviceIdentity) -> Reservation {
        if self.closed {
            return Reservation::Closed;
        }
        if self.drivers.contains_key(&identity) {
            return Reservation::AlreadyTracked;
        }
        match self.slots.reserve() {
            Some(slot) => Reservation::Slot(slot),
            None => Reservation::Exhausted,
        }
    }

    /// Removes `identity` and frees `slot`, but only if the map still records
    /// that identity in that slot.
    pub(crate) fn unregister(&mut self, identity: DeviceIdentity, slot: usize) -> bool {
        let owned = self
            .drivers
            .get(&identity)
            .is_some_and(|driver| driver.slot == slot);
        if owned {
            self.drivers.remove(&identity);
            self.slots.release(slot);
        }
        owned
    }

    /// Players in slot order.
    pub(crate) fn active_players(&self) -> Vec<(DeviceIdentity, usize)> {
        let mut players: Vec<_> = self
            .drivers
            .values()
            .map(|driver| (driver.identity, driver.slot))
            .collect();
        players.sort_by_key(|(_, slot)| *slot);
        players
    }
}

/// Locks the registry, recovering from a poisoned lock.
pub(crate) fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
