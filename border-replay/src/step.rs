//! Environment timesteps and the n-step transitions built from them.
use std::collections::HashMap;
use xxhash_rust::xxh3::Xxh3Builder;

/// Episode-step id, issued monotonically by
/// [`ReplayBuffer::next_eid()`](crate::ReplayBuffer::next_eid).
pub type Eid = u64;

/// Scalar side information attached to a timestep.
pub type Metadata = HashMap<String, f32, Xxh3Builder>;

/// One raw interaction step `(x_t, a_t, r_t, gamma_t)`.
///
/// A terminal timestep carries the last observation of an episode. It never
/// becomes the origin of a transition; it only serves as the "next" step of
/// the windows it closes.
#[derive(Clone, Debug, PartialEq)]
pub struct Timestep<O, A> {
    /// Observation.
    pub obs: O,

    /// Action.
    pub act: A,

    /// Reward.
    pub reward: f32,

    /// Discount, in `[0, 1]`.
    pub gamma: f32,

    /// Optional metadata.
    pub meta: Option<Metadata>,

    /// Flag denoting if the episode is terminated at this step.
    pub is_terminal: bool,
}

impl<O, A> Timestep<O, A> {
    /// Constructs a non-terminal [`Timestep`] without metadata.
    pub fn new(obs: O, act: A, reward: f32, gamma: f32) -> Self {
        Self {
            obs,
            act,
            reward,
            gamma,
            meta: None,
            is_terminal: false,
        }
    }

    /// Sets the terminal flag.
    pub fn terminal(mut self, is_terminal: bool) -> Self {
        self.is_terminal = is_terminal;
        self
    }

    /// Attaches metadata.
    pub fn meta(mut self, meta: Metadata) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// A resolved n-step transition.
///
/// `reward` is the discounted return accumulated over the window starting at
/// `eid` and `gamma` is the product of the discounts in that window. `next_eid`
/// is `None` when the window was closed by a terminal step.
#[derive(Clone, Debug, PartialEq)]
pub struct LaggedTimestep<O, A> {
    /// Id of the origin step.
    pub eid: Eid,

    /// Observation of the origin step.
    pub obs: O,

    /// Action taken at the origin step.
    pub act: A,

    /// n-step return.
    pub reward: f32,

    /// Compounded discount.
    pub gamma: f32,

    /// Metadata of the origin step.
    pub meta: Option<Metadata>,

    /// Flag denoting if the window was closed by a terminal step.
    pub is_terminal: bool,

    /// Id of the step following the window.
    pub next_eid: Option<Eid>,

    /// Observation of the step following the window.
    pub next_obs: O,
}
