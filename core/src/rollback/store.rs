//! Snapshot store
//!
//! A pool of full simulation-state copies addressed by generational handles.
//! Released entries are cleared and queued for reuse, so steady-state
//! rollback performs no allocation beyond the first few saves.

use std::collections::VecDeque;
use std::fmt;

use crate::sim::SimulationState;

use super::config::STATE_POOL_SIZE;

/// Token for one pooled snapshot.
///
/// Valid from the [`SnapshotStore::acquire`] that returned it until it is
/// released. Releasing bumps the slot's generation, so a stale copy of the
/// handle can never reach the slot's next tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotHandle {
    index: u32,
    generation: u32,
}

impl SnapshotHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for SnapshotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "snapshot {}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// Out of range, released, or from an earlier generation. Always an integration bug.
    #[error("invalid {0}")]
    InvalidHandle(SnapshotHandle),
}

#[derive(Debug, Default)]
struct Slot {
    state: SimulationState,
    generation: u32,
    active: bool,
}

/// Pooled arena of simulation-state snapshots.
#[derive(Debug)]
pub struct SnapshotStore {
    slots: Vec<Slot>,
    free: VecDeque<u32>,
    active: usize,
    capacity: usize,
    /// Generation given to freshly allocated slots; survives `dispose`.
    next_generation: u32,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(STATE_POOL_SIZE)
    }
}

impl SnapshotStore {
    /// Create a store with `capacity` snapshots allocated up front.
    pub fn new(capacity: usize) -> Self {
        let mut store = Self {
            slots: Vec::with_capacity(capacity),
            free: VecDeque::with_capacity(capacity),
            active: 0,
            capacity,
            next_generation: 0,
        };
        for index in 0..capacity {
            store.slots.push(Slot::default());
            store.free.push_back(index as u32);
        }
        store
    }

    /// Take a cleared snapshot out of the pool.
    pub fn acquire(&mut self) -> (SnapshotHandle, &mut SimulationState) {
        let index = match self.free.pop_front() {
            Some(index) => index,
            None => {
                if self.slots.len() >= self.capacity {
                    log::warn!(
                        "SnapshotStore exhausted ({} snapshots live), allocating a new one",
                        self.active
                    );
                }
                self.slots.push(self.fresh_slot());
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.active = true;
        self.active += 1;
        let handle = SnapshotHandle {
            index,
            generation: slot.generation,
        };
        (handle, &mut slot.state)
    }

    fn fresh_slot(&self) -> Slot {
        Slot {
            generation: self.next_generation,
            ..Slot::default()
        }
    }

    fn slot(&self, handle: SnapshotHandle) -> Option<&Slot> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.active && slot.generation == handle.generation)
    }

    pub fn get(&self, handle: SnapshotHandle) -> Result<&SimulationState, SnapshotError> {
        self.slot(handle)
            .map(|slot| &slot.state)
            .ok_or(SnapshotError::InvalidHandle(handle))
    }

    pub fn is_active(&self, handle: SnapshotHandle) -> bool {
        self.slot(handle).is_some()
    }

    /// Clear the snapshot and return it to the pool. Releasing a handle that
    /// is no longer active does nothing.
    pub fn release(&mut self, handle: SnapshotHandle) {
        if !self.is_active(handle) {
            return;
        }
        let slot = &mut self.slots[handle.index as usize];
        slot.state.clear();
        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.active -= 1;
        self.free.push_back(handle.index);
    }

    /// Release every active snapshot and drop all pooled memory. Handles
    /// issued before the dispose stay invalid if the store is used again.
    pub fn dispose(&mut self) {
        if self.active > 0 {
            log::debug!("SnapshotStore disposing {} live snapshots", self.active);
        }
        self.next_generation = self
            .slots
            .iter()
            .map(|slot| slot.generation.wrapping_add(1))
            .fold(self.next_generation, u32::max);
        self.slots.clear();
        self.free.clear();
        self.active = 0;
    }

    /// Snapshots currently handed out.
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Snapshots allocated, active or pooled.
    pub fn total_count(&self) -> usize {
        self.slots.len()
    }
}
