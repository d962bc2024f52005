//! Row-aligned batches of n-step transitions.
use crate::{Eid, LaggedTimestep, Metadata};

/// A batch of transitions, one row per requested slot.
///
/// The fields are copies of the stored transitions; mutating a batch never affects
/// the buffer it was taken from.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch<O, A> {
    /// Ids of the origin steps.
    pub eid: Vec<Eid>,

    /// Observations.
    pub obs: Vec<O>,

    /// Actions.
    pub act: Vec<A>,

    /// n-step returns.
    pub reward: Vec<f32>,

    /// Compounded discounts.
    pub gamma: Vec<f32>,

    /// Metadata.
    pub meta: Vec<Option<Metadata>>,

    /// Terminal flags.
    pub is_terminated: Vec<i8>,

    /// Ids of the steps following the windows.
    pub next_eid: Vec<Option<Eid>>,

    /// Next observations.
    pub next_obs: Vec<O>,

    /// Slots holding the next transitions, if still live.
    pub next_ix: Vec<Option<usize>>,

    /// Slots the rows were read from.
    pub ix_sample: Vec<usize>,

    /// Inverse-sampling-ratio weights.
    pub weight: Option<Vec<f32>>,
}

impl<O, A> Batch<O, A> {
    /// Creates an empty batch with room for `capacity` rows.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            eid: Vec::with_capacity(capacity),
            obs: Vec::with_capacity(capacity),
            act: Vec::with_capacity(capacity),
            reward: Vec::with_capacity(capacity),
            gamma: Vec::with_capacity(capacity),
            meta: Vec::with_capacity(capacity),
            is_terminated: Vec::with_capacity(capacity),
            next_eid: Vec::with_capacity(capacity),
            next_obs: Vec::with_capacity(capacity),
            next_ix: Vec::with_capacity(capacity),
            ix_sample: Vec::with_capacity(capacity),
            weight: None,
        }
    }

    /// Appends a row.
    pub fn push(&mut self, ix: usize, next_ix: Option<usize>, tr: LaggedTimestep<O, A>) {
        self.eid.push(tr.eid);
        self.obs.push(tr.obs);
        self.act.push(tr.act);
        self.reward.push(tr.reward);
        self.gamma.push(tr.gamma);
        self.meta.push(tr.meta);
        self.is_terminated.push(tr.is_terminal as i8);
        self.next_eid.push(tr.next_eid);
        self.next_obs.push(tr.next_obs);
        self.next_ix.push(next_ix);
        self.ix_sample.push(ix);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }
}

impl<O: Clone, A: Clone> Batch<O, A> {
    /// Rebuilds the transition in row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    pub fn transition(&self, i: usize) -> LaggedTimestep<O, A> {
        LaggedTimestep {
            eid: self.eid[i],
            obs: self.obs[i].clone(),
            act: self.act[i].clone(),
            reward: self.reward[i],
            gamma: self.gamma[i],
            meta: self.meta[i].clone(),
            is_terminal: self.is_terminated[i] == 1,
            next_eid: self.next_eid[i],
            next_obs: self.next_obs[i].clone(),
        }
    }
}
