//! Prioritized sampling with backward propagation along trajectories.
use super::{PrioritySampler, Sampler};
use crate::{config::PrioritySequenceConfig, LaggedTimestep, ReplayError, Result};
use std::collections::BTreeMap;

/// A [`PrioritySampler`] whose updates also raise the priorities of the steps
/// leading to the updated one.
///
/// Updating slot `idx` with priority `p` merges `p * trace_decay^k` into slot
/// `idx - k` (modulo capacity) for `k = 1..=trace_depth`. Propagation from a
/// slot stops before the first predecessor that
///
/// * closed an episode (its transition is terminal) or ends a trajectory cut
///   by a flush,
/// * is not occupied, or
/// * is the most recently written slot, i.e. lies on the other side of the
///   ring's write head.
pub struct PrioritySequenceSampler {
    inner: PrioritySampler,

    /// `decay[k] = trace_decay^k` for `k = 0..=trace_depth`.
    decay: Vec<f32>,
    combine: fn(f32, f32) -> f32,

    /// Slots whose current occupant ends a trajectory.
    terminal: Vec<bool>,

    /// Most recently written slot.
    head: Option<usize>,
}

impl PrioritySequenceSampler {
    /// Raw priority of slot `idx`.
    pub fn priority(&self, idx: usize) -> Result<f32> {
        self.inner.priority(idx)
    }

    /// Sum of all priorities raised to `alpha`.
    pub fn total(&self) -> f64 {
        self.inner.total()
    }

    /// Number of predecessors reached by propagation.
    pub fn trace_depth(&self) -> usize {
        self.decay.len() - 1
    }

    /// Slot preceding `idx` on the same trajectory, if any.
    fn predecessor(&self, idx: usize) -> Option<usize> {
        let capacity = self.inner.capacity();
        let prev = (idx + capacity - 1) % capacity;
        if Some(prev) == self.head || !self.inner.is_occupied(prev) || self.terminal[prev] {
            None
        } else {
            Some(prev)
        }
    }
}

impl Sampler for PrioritySequenceSampler {
    type Config = PrioritySequenceConfig;

    fn build(capacity: usize, config: &Self::Config, seed: u64) -> Result<Self> {
        config.validate()?;
        let inner = PrioritySampler::build(capacity, &config.priority, seed)?;
        let decay = (0..=config.trace_depth)
            .map(|k| config.trace_decay.powi(k as i32))
            .collect();

        Ok(Self {
            inner,
            decay,
            combine: config.combinator.op(),
            terminal: vec![false; capacity],
            head: None,
        })
    }

    fn replace<O, A>(&mut self, idx: usize, transition: &LaggedTimestep<O, A>) -> Result<()> {
        self.inner.replace(idx, transition)?;
        self.terminal[idx] = transition.is_terminal;
        self.head = Some(idx);
        Ok(())
    }

    fn mark_boundary(&mut self, idx: usize) -> Result<()> {
        if !self.inner.is_occupied(idx) {
            return Err(ReplayError::Index {
                idx,
                capacity: self.inner.capacity(),
            });
        }
        self.terminal[idx] = true;
        Ok(())
    }

    fn sample(&mut self, n: usize) -> Result<Vec<usize>> {
        self.inner.sample(n)
    }

    fn isr_weights(&self, idxs: &[usize]) -> Result<Vec<f32>> {
        self.inner.isr_weights(idxs)
    }

    /// Within one call the origins are processed in order. A direct update
    /// overwrites the slot's pending value; a propagated one is merged into it.
    /// All touched slots are then written to the sum tree at once.
    fn update(&mut self, idxs: &[usize], priorities: &[f32]) -> Result<()> {
        self.inner.check_update(idxs, priorities)?;

        let mut pending = BTreeMap::<usize, f32>::new();
        for (&idx, &p) in idxs.iter().zip(priorities.iter()) {
            pending.insert(idx, p);

            let mut cur = idx;
            for k in 1..self.decay.len() {
                let prev = match self.predecessor(cur) {
                    Some(prev) => prev,
                    None => break,
                };
                let held = match pending.get(&prev) {
                    Some(&held) => held,
                    None => self.inner.priority(prev)?,
                };
                pending.insert(prev, (self.combine)(held, p * self.decay[k]));
                cur = prev;
            }
        }

        let items = pending.into_iter().collect::<Vec<_>>();
        self.inner.commit(&items);
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.terminal.iter_mut().for_each(|t| *t = false);
        self.head = None;
    }
}

impl std::fmt::Debug for PrioritySequenceSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrioritySequenceSampler")
            .field("len", &self.inner.len())
            .field("decay", &self.decay)
            .field("head", &self.head)
            .finish()
    }
}
