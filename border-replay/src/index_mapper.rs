//! Mapping from episode-step ids to ring slots.
use crate::{Eid, ReplayError, Result};
use log::trace;
use std::collections::HashMap;
use xxhash_rust::xxh3::Xxh3Builder;

/// Maps monotonically increasing [`Eid`]s onto the slots `0..capacity` of a ring.
///
/// Slots are handed out in order, `idx = counter % capacity`. When the ring wraps
/// around, the eid previously living in the slot is evicted and can no longer
/// be resolved.
pub struct IndexMapper {
    capacity: usize,

    /// Number of slots handed out so far.
    counter: usize,

    /// Live occupant of each slot.
    slots: Vec<Option<Eid>>,

    eid2idx: HashMap<Eid, usize, Xxh3Builder>,
}

impl IndexMapper {
    /// Creates a mapper over `capacity` slots.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ReplayError::Configuration(
                "capacity must be positive".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            counter: 0,
            slots: vec![None; capacity],
            eid2idx: HashMap::with_capacity_and_hasher(capacity, Xxh3Builder::default()),
        })
    }

    /// Assigns a slot to `eid` and returns it.
    ///
    /// Calling this again for an eid that is still live returns the same slot and
    /// does not advance the ring.
    pub fn add_eid(&mut self, eid: Eid) -> usize {
        if let Some(&idx) = self.eid2idx.get(&eid) {
            return idx;
        }

        let idx = self.counter % self.capacity;
        self.counter += 1;

        if let Some(old) = self.slots[idx].replace(eid) {
            trace!("Evict eid {} from slot {}", old, idx);
            self.eid2idx.remove(&old);
        }
        self.eid2idx.insert(eid, idx);

        idx
    }

    /// Resolves eids to their current slots.
    ///
    /// Fails with [`ReplayError::Lookup`] on the first eid that is not live.
    pub fn eids2idxs(&self, eids: &[Eid]) -> Result<Vec<usize>> {
        eids.iter()
            .map(|eid| {
                self.eid2idx
                    .get(eid)
                    .copied()
                    .ok_or(ReplayError::Lookup(*eid))
            })
            .collect()
    }

    /// Returns the eid currently living in slot `idx`.
    pub fn idx2eid(&self, idx: usize) -> Option<Eid> {
        self.slots.get(idx).copied().flatten()
    }

    /// Number of live mappings.
    pub fn len(&self) -> usize {
        self.eid2idx.len()
    }

    /// Returns `true` if no eid is mapped.
    pub fn is_empty(&self) -> bool {
        self.eid2idx.is_empty()
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops all mappings and rewinds the ring.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.slots.iter_mut().for_each(|s| *s = None);
        self.eid2idx.clear();
    }
}
