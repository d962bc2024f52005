//! Uniform sampling over the filled slots.
use super::{check_index, check_occupied, check_update, Sampler};
use crate::{config::UniformConfig, LaggedTimestep, ReplayError, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Draws filled slots uniformly with replacement.
pub struct UniformSampler {
    occupied: Vec<bool>,

    /// Occupied slots in order of first write.
    filled: Vec<usize>,
    rng: StdRng,
}

impl Sampler for UniformSampler {
    type Config = UniformConfig;

    fn build(capacity: usize, _config: &Self::Config, seed: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(ReplayError::Configuration(
                "capacity must be positive".to_string(),
            ));
        }

        Ok(Self {
            occupied: vec![false; capacity],
            filled: Vec::with_capacity(capacity),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    fn replace<O, A>(&mut self, idx: usize, _transition: &LaggedTimestep<O, A>) -> Result<()> {
        check_index(idx, self.occupied.len())?;
        if !self.occupied[idx] {
            self.occupied[idx] = true;
            self.filled.push(idx);
        }
        Ok(())
    }

    fn sample(&mut self, n: usize) -> Result<Vec<usize>> {
        if self.filled.is_empty() {
            return Err(ReplayError::Empty);
        }
        let size = self.filled.len();
        Ok((0..n)
            .map(|_| self.filled[self.rng.gen_range(0..size)])
            .collect())
    }

    fn isr_weights(&self, idxs: &[usize]) -> Result<Vec<f32>> {
        check_occupied(idxs, &self.occupied)?;
        Ok(vec![1.0; idxs.len()])
    }

    /// Priorities have no effect on uniform sampling; the arguments are only
    /// checked.
    fn update(&mut self, idxs: &[usize], priorities: &[f32]) -> Result<()> {
        check_update(idxs, priorities, &self.occupied)
    }

    fn len(&self) -> usize {
        self.filled.len()
    }

    fn reset(&mut self) {
        self.occupied.iter_mut().for_each(|o| *o = false);
        self.filled.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy() -> LaggedTimestep<(), ()> {
        LaggedTimestep {
            eid: 0,
            obs: (),
            act: (),
            reward: 0.0,
            gamma: 1.0,
            meta: None,
            is_terminal: false,
            next_eid: None,
            next_obs: (),
        }
    }

    #[test]
    fn test_uniform_frequencies() -> Result<()> {
        let n_slots = 5;
        let mut sampler = UniformSampler::build(8, &UniformConfig::default(), 42)?;
        for idx in 0..n_slots {
            sampler.replace(idx, &dummy())?;
        }
        assert_eq!(sampler.len(), n_slots);

        let n_samples = 100_000;
        let ixs = sampler.sample(n_samples)?;
        let mut counts = vec![0usize; 8];
        ixs.iter().for_each(|&ix| counts[ix] += 1);

        assert!(counts[n_slots..].iter().all(|&c| c == 0));
        for &c in counts[..n_slots].iter() {
            let freq = c as f32 / n_samples as f32;
            assert!((freq - 0.2).abs() < 0.01, "{:?}", counts);
        }
        Ok(())
    }

    #[test]
    fn test_replace_counts_slots_once() -> Result<()> {
        let mut sampler = UniformSampler::build(2, &UniformConfig::default(), 0)?;
        for _ in 0..3 {
            sampler.replace(0, &dummy())?;
        }
        assert_eq!(sampler.len(), 1);
        assert!(sampler.replace(2, &dummy()).is_err());
        Ok(())
    }

    #[test]
    fn test_weights_are_ones() -> Result<()> {
        let mut sampler = UniformSampler::build(4, &UniformConfig::default(), 0)?;
        assert_eq!(sampler.sample(1), Err(ReplayError::Empty));
        sampler.replace(0, &dummy())?;
        sampler.replace(1, &dummy())?;
        assert_eq!(sampler.isr_weights(&[1, 0, 1])?, vec![1.0; 3]);
        assert!(sampler.isr_weights(&[3]).is_err());
        Ok(())
    }

    #[test]
    fn test_draws_only_filled_slots() -> Result<()> {
        let mut sampler = UniformSampler::build(8, &UniformConfig::default(), 3)?;
        sampler.replace(0, &dummy())?;
        sampler.replace(3, &dummy())?;

        let ixs = sampler.sample(1000)?;
        assert!(ixs.iter().all(|&ix| ix == 0 || ix == 3));
        assert!(ixs.contains(&0) && ixs.contains(&3));
        Ok(())
    }
}
