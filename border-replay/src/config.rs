//! Configuration of [`ReplayBuffer`](crate::ReplayBuffer) and its samplers.
//!
//! Every configuration is validated when the corresponding object is built, so
//! that an invalid value is reported before any step is added.
//!
//! ```rust
//! use border_replay::{Combinator, PrioritySequenceConfig, ReplayBufferConfig};
//!
//! let config = ReplayBufferConfig::default()
//!     .capacity(100_000)
//!     .lag(3)
//!     .seed(42)
//!     .sampler(
//!         PrioritySequenceConfig::default()
//!             .trace_depth(3)
//!             .trace_decay(0.5)
//!             .combinator(Combinator::Max),
//!     );
//! ```
use crate::{ReplayError, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
    str::FromStr,
};

fn check_unit_interval(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ReplayError::Configuration(format!(
            "{} must be in [0, 1]: {}",
            name, value
        )))
    }
}

/// How a propagated priority is merged into the priority already held by a slot.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// Keeps the larger of the two.
    Max,

    /// Adds the two.
    Sum,
}

impl Combinator {
    /// Returns the merge operation.
    pub fn op(self) -> fn(f32, f32) -> f32 {
        match self {
            Combinator::Max => f32::max,
            Combinator::Sum => |current, propagated| current + propagated,
        }
    }
}

impl FromStr for Combinator {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "max" => Ok(Combinator::Max),
            "sum" => Ok(Combinator::Sum),
            _ => Err(ReplayError::Configuration(format!(
                "unknown combinator '{}', expected 'max' or 'sum'",
                s
            ))),
        }
    }
}

/// Configuration of [`UniformSampler`](crate::UniformSampler).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct UniformConfig {}

/// Configuration of [`PrioritySampler`](crate::PrioritySampler).
///
/// A slot `i` is drawn with probability
/// $u / N + (1 - u) p_i^\alpha / \sum_j p_j^\alpha$, where $u$ is
/// `uniform_probability` and $N$ the number of stored transitions.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PriorityConfig {
    /// Weight of the uniform component of the sampling distribution.
    pub uniform_probability: f32,

    /// Exponent applied to priorities before they enter the sum tree.
    pub alpha: f32,

    /// Priority of new transitions while no positive priority is stored.
    /// Afterwards new transitions receive the maximum stored priority.
    pub initial_priority: f32,

    /// Initial exponent of the ISR weights.
    pub beta_0: f32,

    /// Final exponent of the ISR weights.
    pub beta_final: f32,

    /// Number of priority updates after which the exponent reaches `beta_final`.
    pub n_updates_final: usize,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            uniform_probability: 0.0,
            alpha: 1.0,
            initial_priority: 1.0,
            beta_0: 1.0,
            beta_final: 1.0,
            n_updates_final: 1,
        }
    }
}

impl PriorityConfig {
    /// Sets the weight of the uniform component.
    pub fn uniform_probability(mut self, uniform_probability: f32) -> Self {
        self.uniform_probability = uniform_probability;
        self
    }

    /// Sets the priority exponent `alpha`.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the priority of the first transitions.
    pub fn initial_priority(mut self, initial_priority: f32) -> Self {
        self.initial_priority = initial_priority;
        self
    }

    /// Sets the initial ISR exponent.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the final ISR exponent.
    pub fn beta_final(mut self, beta_final: f32) -> Self {
        self.beta_final = beta_final;
        self
    }

    /// Sets the length of the ISR exponent schedule.
    pub fn n_updates_final(mut self, n_updates_final: usize) -> Self {
        self.n_updates_final = n_updates_final;
        self
    }

    /// Checks the ranges of all values.
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("uniform_probability", self.uniform_probability)?;
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(ReplayError::Configuration(format!(
                "alpha must be finite and non-negative: {}",
                self.alpha
            )));
        }
        if !(self.initial_priority.is_finite() && self.initial_priority > 0.0) {
            return Err(ReplayError::Configuration(format!(
                "initial_priority must be finite and positive: {}",
                self.initial_priority
            )));
        }
        for (name, beta) in [("beta_0", self.beta_0), ("beta_final", self.beta_final)] {
            if !(beta.is_finite() && beta >= 0.0) {
                return Err(ReplayError::Configuration(format!(
                    "{} must be finite and non-negative: {}",
                    name, beta
                )));
            }
        }
        Ok(())
    }
}

/// Configuration of [`PrioritySequenceSampler`](crate::PrioritySequenceSampler).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PrioritySequenceConfig {
    /// Configuration of the underlying priority sampler.
    pub priority: PriorityConfig,

    /// Factor applied per step when a priority is propagated backward.
    pub trace_decay: f32,

    /// Number of preceding slots a priority is propagated to.
    pub trace_depth: usize,

    /// Merge operation of propagated priorities.
    pub combinator: Combinator,
}

impl Default for PrioritySequenceConfig {
    fn default() -> Self {
        Self {
            priority: PriorityConfig::default(),
            trace_decay: 0.9,
            trace_depth: 3,
            combinator: Combinator::Max,
        }
    }
}

impl PrioritySequenceConfig {
    /// Sets the configuration of the underlying priority sampler.
    pub fn priority(mut self, priority: PriorityConfig) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the decay of propagated priorities.
    pub fn trace_decay(mut self, trace_decay: f32) -> Self {
        self.trace_decay = trace_decay;
        self
    }

    /// Sets the propagation depth.
    pub fn trace_depth(mut self, trace_depth: usize) -> Self {
        self.trace_depth = trace_depth;
        self
    }

    /// Sets the merge operation.
    pub fn combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    /// Checks the ranges of all values.
    pub fn validate(&self) -> Result<()> {
        self.priority.validate()?;
        check_unit_interval("trace_decay", self.trace_decay)
    }
}

/// Configuration of [`ReplayBuffer`](crate::ReplayBuffer).
///
/// `C` is the configuration of the sampler.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayBufferConfig<C> {
    /// Maximum number of transitions held by the buffer.
    pub capacity: usize,

    /// Number of steps aggregated into a transition.
    pub lag: usize,

    /// Seed of the random number generator used for sampling.
    pub seed: u64,

    /// Configuration of the sampler.
    pub sampler: C,
}

impl<C: Default> Default for ReplayBufferConfig<C> {
    fn default() -> Self {
        Self {
            capacity: 10000,
            lag: 1,
            seed: 42,
            sampler: C::default(),
        }
    }
}

impl<C> ReplayBufferConfig<C> {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the number of steps aggregated into a transition.
    pub fn lag(mut self, lag: usize) -> Self {
        self.lag = lag;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the configuration of the sampler.
    pub fn sampler(mut self, sampler: C) -> Self {
        self.sampler = sampler;
        self
    }

    /// Checks the values used by the buffer itself.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ReplayError::Configuration(
                "capacity must be positive".to_string(),
            ));
        }
        if self.lag == 0 {
            return Err(ReplayError::Configuration(
                "lag must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl<C: Serialize + DeserializeOwned> ReplayBufferConfig<C> {
    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_replay_buffer_config() -> anyhow::Result<()> {
        let config = ReplayBufferConfig::default()
            .capacity(500)
            .lag(4)
            .seed(7)
            .sampler(
                PrioritySequenceConfig::default()
                    .trace_depth(5)
                    .combinator(Combinator::Sum)
                    .priority(PriorityConfig::default().uniform_probability(0.1)),
            );

        let dir = TempDir::new("replay_buffer_config")?;
        let path = dir.path().join("replay_buffer.yaml");
        config.save(&path)?;
        let config_ = ReplayBufferConfig::<PrioritySequenceConfig>::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_unknown_combinator() {
        assert_eq!("max".parse::<Combinator>(), Ok(Combinator::Max));
        assert_eq!("sum".parse::<Combinator>(), Ok(Combinator::Sum));
        assert!(matches!(
            "min".parse::<Combinator>(),
            Err(ReplayError::Configuration(_))
        ));

        let yaml = "priority:\n  uniform_probability: 0.0\n  alpha: 1.0\n  initial_priority: 1.0\n  beta_0: 1.0\n  beta_final: 1.0\n  n_updates_final: 1\ntrace_decay: 0.5\ntrace_depth: 2\ncombinator: prod\n";
        assert!(serde_yaml::from_str::<PrioritySequenceConfig>(yaml).is_err());
    }

    #[test]
    fn test_combinator_op() {
        assert_eq!((Combinator::Max.op())(1.0, 3.0), 3.0);
        assert_eq!((Combinator::Sum.op())(1.0, 3.0), 4.0);
    }

    #[test]
    fn test_validate() {
        assert!(PriorityConfig::default().validate().is_ok());
        assert!(PriorityConfig::default()
            .uniform_probability(1.5)
            .validate()
            .is_err());
        assert!(PriorityConfig::default().alpha(-1.0).validate().is_err());
        assert!(PriorityConfig::default()
            .initial_priority(0.0)
            .validate()
            .is_err());
        assert!(PrioritySequenceConfig::default()
            .trace_decay(1.1)
            .validate()
            .is_err());
        assert!(ReplayBufferConfig::<UniformConfig>::default()
            .capacity(0)
            .validate()
            .is_err());
        assert!(ReplayBufferConfig::<UniformConfig>::default()
            .lag(0)
            .validate()
            .is_err());
    }
}
