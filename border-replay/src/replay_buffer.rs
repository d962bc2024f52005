//! Replay buffer of n-step transitions.
use crate::{
    config::ReplayBufferConfig, Batch, Eid, IndexMapper, LagBuffer, LaggedTimestep, Result,
    Sampler, Storage, Timestep,
};
use log::{debug, info};

/// Identifies the transitions whose priorities are updated.
#[derive(Clone, Copy, Debug)]
pub enum Keys<'a> {
    /// Slot indices, e.g. [`Batch::ix_sample`].
    Idx(&'a [usize]),

    /// Episode-step ids, e.g. [`Batch::eid`].
    Eid(&'a [Eid]),
}

/// A fixed-capacity replay buffer fed with raw timesteps.
///
/// Each [`Timestep`] passed to [`ReplayBuffer::add_step()`] receives a fresh
/// [`Eid`] and goes through a [`LagBuffer`]; the n-step transitions it resolves
/// are given ring slots by an [`IndexMapper`], written to [`Storage`] and
/// registered with the sampler `S`.
///
/// The buffer is single-threaded. Sharing it between threads requires an external
/// lock around every call.
///
/// ```rust
/// use border_replay::{
///     Keys, PrioritySequenceConfig, PrioritySequenceReplayBuffer, ReplayBufferConfig, Timestep,
/// };
///
/// # fn main() -> border_replay::Result<()> {
/// let config = ReplayBufferConfig::default()
///     .capacity(1000)
///     .lag(3)
///     .sampler(PrioritySequenceConfig::default());
/// let mut buffer = PrioritySequenceReplayBuffer::<f32, i64>::build(&config)?;
///
/// for t in 0..10 {
///     let step = Timestep::new(t as f32, 0, 1.0, 0.99).terminal(t == 9);
///     buffer.add_step(step)?;
/// }
/// assert_eq!(buffer.size(), 9);
///
/// let batch = buffer.sample(4)?;
/// let td_errs = vec![0.5; batch.len()];
/// buffer.update(Keys::Idx(&batch.ix_sample), &td_errs)?;
/// # Ok(())
/// # }
/// ```
pub struct ReplayBuffer<O, A, S> {
    capacity: usize,
    index_mapper: IndexMapper,
    storage: Storage<O, A>,
    lag_buffer: LagBuffer<O, A>,
    sampler: S,

    /// Last issued eid.
    last_eid: Option<Eid>,

    /// Slot written last.
    last_idx: Option<usize>,
}

impl<O, A, S> ReplayBuffer<O, A, S>
where
    O: Clone,
    A: Clone,
    S: Sampler,
{
    /// Builds a replay buffer, validating the whole configuration.
    pub fn build(config: &ReplayBufferConfig<S::Config>) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        let sampler = S::build(capacity, &config.sampler, config.seed)?;
        info!(
            "Build replay buffer: capacity = {}, lag = {}, sampler = {}",
            capacity,
            config.lag,
            std::any::type_name::<S>()
        );

        Ok(Self {
            capacity,
            index_mapper: IndexMapper::new(capacity)?,
            storage: Storage::new(capacity)?,
            lag_buffer: LagBuffer::new(config.lag)?,
            sampler,
            last_eid: None,
            last_idx: None,
        })
    }

    /// Returns the eid the next accepted [`ReplayBuffer::add_step()`] assigns.
    pub fn next_eid(&self) -> Eid {
        self.last_eid.map_or(0, |eid| eid + 1)
    }

    /// Returns the eid assigned by the last accepted step.
    pub fn last_eid(&self) -> Option<Eid> {
        self.last_eid
    }

    /// Adds a timestep and stores the transitions it resolves.
    ///
    /// Returns the number of transitions stored. A rejected timestep does not
    /// consume an eid.
    pub fn add_step(&mut self, step: Timestep<O, A>) -> Result<usize> {
        let eid = self.next_eid();
        let transitions = self.lag_buffer.add(eid, step)?;
        self.last_eid = Some(eid);

        let mut n = 0;
        for tr in transitions {
            self.store(tr)?;
            n += 1;
        }
        Ok(n)
    }

    fn store(&mut self, tr: LaggedTimestep<O, A>) -> Result<()> {
        let idx = self.index_mapper.add_eid(tr.eid);

        // Transitions of an episode are stored in the order of their origins, so the
        // successor lands `lag` slots further unless the episode is flushed first.
        // Storage checks the guess when it is read.
        let next_idx = tr
            .next_eid
            .map(|_| (idx + self.lag_buffer.lag()) % self.capacity);

        self.sampler.replace(idx, &tr)?;
        self.storage.add(idx, next_idx, tr)?;
        self.last_idx = Some(idx);
        Ok(())
    }

    /// Number of stored transitions.
    pub fn size(&self) -> usize {
        self.storage.len()
    }

    /// Maximum number of stored transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Draws `n` transitions and attaches their ISR weights.
    pub fn sample(&mut self, n: usize) -> Result<Batch<O, A>> {
        let ixs = self.sampler.sample(n)?;
        let weight = self.sampler.isr_weights(&ixs)?;
        let mut batch = self.storage.get(&ixs)?;
        batch.weight = Some(weight);
        Ok(batch)
    }

    /// Returns the transitions starting at `eids`.
    pub fn get(&self, eids: &[Eid]) -> Result<Batch<O, A>> {
        let ixs = self.index_mapper.eids2idxs(eids)?;
        self.storage.get(&ixs)
    }

    /// Returns the ISR weights of the transitions starting at `eids`.
    pub fn isr_weights(&self, eids: &[Eid]) -> Result<Vec<f32>> {
        let ixs = self.index_mapper.eids2idxs(eids)?;
        self.sampler.isr_weights(&ixs)
    }

    /// Sets the priorities of the transitions identified by `keys`, typically to
    /// the magnitudes of their TD errors.
    pub fn update(&mut self, keys: Keys<'_>, priorities: &[f32]) -> Result<()> {
        match keys {
            Keys::Idx(ixs) => self.sampler.update(ixs, priorities),
            Keys::Eid(eids) => {
                let ixs = self.index_mapper.eids2idxs(eids)?;
                self.sampler.update(&ixs, priorities)
            }
        }
    }

    /// Discards the open windows of the current episode.
    ///
    /// The transitions stored so far are cut off from the ones added afterwards,
    /// so priorities are never propagated across the flush.
    pub fn flush(&mut self) -> Result<()> {
        self.lag_buffer.flush();
        match self.last_idx {
            Some(idx) => self.sampler.mark_boundary(idx),
            None => Ok(()),
        }
    }

    /// Empties the buffer. Eids keep increasing across resets.
    pub fn reset(&mut self) {
        debug!("Reset replay buffer with {} transitions", self.size());
        self.index_mapper.reset();
        self.storage.reset();
        self.lag_buffer.flush();
        self.sampler.reset();
        self.last_idx = None;
    }

    /// Returns the sampler.
    pub fn sampler(&self) -> &S {
        &self.sampler
    }
}
