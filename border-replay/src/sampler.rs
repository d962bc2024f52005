//! Samplers drawing slot indices for training batches.
//!
//! A sampler only knows about the slot space `0..capacity` of the buffer. It is
//! told about every slot write through [`Sampler::replace()`] and answers with
//! slot indices, which the [`ReplayBuffer`](crate::ReplayBuffer) turns into
//! [`Batch`](crate::Batch)es.
//!
//! * [`UniformSampler`] draws uniformly over the filled slots.
//! * [`PrioritySampler`] draws in proportion to priorities kept in a sum tree,
//!   mixed with a uniform component.
//! * [`PrioritySequenceSampler`] additionally propagates every priority update to
//!   the preceding steps of the same trajectory.
mod iw_scheduler;
mod priority;
mod sequence;
mod sum_tree;
mod uniform;
use crate::{LaggedTimestep, ReplayError, Result};
pub use iw_scheduler::IwScheduler;
pub use priority::PrioritySampler;
pub use sequence::PrioritySequenceSampler;
pub use sum_tree::SumTree;
pub use uniform::UniformSampler;

/// Interface of the samplers used by [`ReplayBuffer`](crate::ReplayBuffer).
pub trait Sampler: Sized {
    /// Configuration of the sampler.
    type Config: Clone;

    /// Builds a sampler over `capacity` slots, drawing from a generator seeded
    /// with `seed`.
    ///
    /// Invalid configuration values are reported here, never on first use.
    fn build(capacity: usize, config: &Self::Config, seed: u64) -> Result<Self>;

    /// Registers `transition` as the new occupant of slot `idx`.
    fn replace<O, A>(&mut self, idx: usize, transition: &LaggedTimestep<O, A>) -> Result<()>;

    /// Records that the trajectory through slot `idx` ends there, although its
    /// transition is not terminal. Cleared by the next [`Sampler::replace()`] of
    /// the slot.
    fn mark_boundary(&mut self, _idx: usize) -> Result<()> {
        Ok(())
    }

    /// Draws `n` slots with replacement.
    fn sample(&mut self, n: usize) -> Result<Vec<usize>>;

    /// Returns the inverse-sampling-ratio weights of `idxs`, normalized so that
    /// their maximum is 1.
    fn isr_weights(&self, idxs: &[usize]) -> Result<Vec<f32>>;

    /// Sets the priorities of `idxs`.
    fn update(&mut self, idxs: &[usize], priorities: &[f32]) -> Result<()>;

    /// Number of occupied slots.
    fn len(&self) -> usize;

    /// Returns `true` if no slot is occupied.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every slot.
    fn reset(&mut self);
}

/// Checks the arguments of [`Sampler::update()`] without touching any state.
fn check_update(
    idxs: &[usize],
    priorities: &[f32],
    occupied: &[bool],
) -> Result<()> {
    if idxs.len() != priorities.len() {
        return Err(ReplayError::Shape {
            name: "priorities",
            expected: idxs.len(),
            actual: priorities.len(),
        });
    }
    check_occupied(idxs, occupied)?;
    if let Some(p) = priorities.iter().find(|p| !(p.is_finite() && **p >= 0.0)) {
        return Err(ReplayError::ContractViolation(format!(
            "priority must be finite and non-negative: {}",
            p
        )));
    }
    Ok(())
}

fn check_occupied(idxs: &[usize], occupied: &[bool]) -> Result<()> {
    match idxs
        .iter()
        .find(|&&idx| !occupied.get(idx).copied().unwrap_or(false))
    {
        Some(&idx) => Err(ReplayError::Index {
            idx,
            capacity: occupied.len(),
        }),
        None => Ok(()),
    }
}

fn check_index(idx: usize, capacity: usize) -> Result<()> {
    if idx < capacity {
        Ok(())
    } else {
        Err(ReplayError::Index { idx, capacity })
    }
}
