#![warn(missing_docs)]
//! N-step experience replay for reinforcement learning.
//!
//! Raw environment steps ([`Timestep`]) are added one at a time to a
//! [`ReplayBuffer`]. A [`LagBuffer`] folds them into n-step transitions
//! ([`LaggedTimestep`]) carrying the discounted return and the cumulative
//! discount of the window, and the buffer keeps the most recent `capacity` of
//! them in a ring. Training batches are drawn by a [`Sampler`]:
//!
//! * [`UniformSampler`] for uniform experience replay,
//! * [`PrioritySampler`] for prioritized experience replay (PER),
//! * [`PrioritySequenceSampler`] for PER with priorities propagated backward
//!   along trajectories.
//!
//! Every transition is addressed by the episode-step id ([`Eid`]) of its first
//! step, which stays valid until the transition is evicted.
pub mod config;
pub mod error;
pub mod sampler;

mod batch;
mod index_mapper;
mod lag_buffer;
mod replay_buffer;
mod step;
mod storage;

pub use batch::Batch;
pub use config::{
    Combinator, PriorityConfig, PrioritySequenceConfig, ReplayBufferConfig, UniformConfig,
};
pub use error::{ReplayError, Result};
pub use index_mapper::IndexMapper;
pub use lag_buffer::{LagBuffer, LaggedSteps};
pub use replay_buffer::{Keys, ReplayBuffer};
pub use sampler::{
    IwScheduler, PrioritySampler, PrioritySequenceSampler, Sampler, SumTree, UniformSampler,
};
pub use step::{Eid, LaggedTimestep, Metadata, Timestep};
pub use storage::Storage;

/// Replay buffer with uniform sampling.
pub type UniformReplayBuffer<O, A> = ReplayBuffer<O, A, UniformSampler>;

/// Replay buffer with prioritized sampling.
pub type PriorityReplayBuffer<O, A> = ReplayBuffer<O, A, PrioritySampler>;

/// Replay buffer with prioritized sampling and backward priority propagation.
pub type PrioritySequenceReplayBuffer<O, A> = ReplayBuffer<O, A, PrioritySequenceSampler>;
