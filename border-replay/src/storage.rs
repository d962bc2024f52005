//! Slot-addressed storage of n-step transitions.
use crate::{Batch, LaggedTimestep, ReplayError, Result};

struct Slot<O, A> {
    transition: LaggedTimestep<O, A>,

    /// Slot expected to hold the transition starting at `transition.next_eid`.
    /// It is not kept consistent on eviction.
    next_idx: Option<usize>,
}

/// Fixed number of slots holding [`LaggedTimestep`]s.
pub struct Storage<O, A> {
    capacity: usize,
    slots: Vec<Option<Slot<O, A>>>,

    /// Number of slots ever written.
    size: usize,
}

impl<O, A> Storage<O, A> {
    /// Creates storage with `capacity` empty slots.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ReplayError::Configuration(
                "capacity must be positive".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            slots: (0..capacity).map(|_| None).collect(),
            size: 0,
        })
    }

    /// Writes `transition` into slot `idx`, overwriting its previous content.
    pub fn add(
        &mut self,
        idx: usize,
        next_idx: Option<usize>,
        transition: LaggedTimestep<O, A>,
    ) -> Result<()> {
        let capacity = self.capacity;
        let slot = self
            .slots
            .get_mut(idx)
            .ok_or(ReplayError::Index { idx, capacity })?;

        if slot.is_none() {
            self.size += 1;
        }
        *slot = Some(Slot {
            transition,
            next_idx,
        });

        Ok(())
    }

    fn slot(&self, idx: usize) -> Result<&Slot<O, A>> {
        self.slots
            .get(idx)
            .and_then(|s| s.as_ref())
            .ok_or(ReplayError::Index {
                idx,
                capacity: self.capacity,
            })
    }

    /// Returns a reference to the transition in slot `idx`.
    pub fn transition(&self, idx: usize) -> Result<&LaggedTimestep<O, A>> {
        Ok(&self.slot(idx)?.transition)
    }

    /// Returns the slot holding the successor of the transition in slot `idx`.
    ///
    /// The recorded slot is checked against the successor's eid; `None` is
    /// returned when it has been overwritten since.
    pub fn next_idx(&self, idx: usize) -> Result<Option<usize>> {
        let slot = self.slot(idx)?;
        let next_idx = match (slot.next_idx, slot.transition.next_eid) {
            (Some(next_idx), Some(next_eid)) => self
                .slots
                .get(next_idx)
                .and_then(|s| s.as_ref())
                .filter(|s| s.transition.eid == next_eid)
                .map(|_| next_idx),
            _ => None,
        };
        Ok(next_idx)
    }

    /// Number of slots ever written, at most the capacity.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Empties all slots.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.size = 0;
    }
}

impl<O: Clone, A: Clone> Storage<O, A> {
    /// Copies the transitions in `idxs` into a [`Batch`], in request order.
    ///
    /// All indices are checked before anything is copied.
    pub fn get(&self, idxs: &[usize]) -> Result<Batch<O, A>> {
        let slots = idxs
            .iter()
            .map(|&idx| self.slot(idx))
            .collect::<Result<Vec<_>>>()?;

        let mut batch = Batch::with_capacity(idxs.len());
        for (&idx, slot) in idxs.iter().zip(slots) {
            batch.push(idx, self.next_idx(idx)?, slot.transition.clone());
        }

        Ok(batch)
    }
}
