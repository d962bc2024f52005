//! Prioritized sampling.
use super::{check_index, check_occupied, check_update, IwScheduler, Sampler, SumTree};
use crate::{config::PriorityConfig, LaggedTimestep, ReplayError, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use segment_tree::{ops::MaxIgnoreNaN, SegmentPoint};

/// Draws slots in proportion to their priorities.
///
/// The sampling distribution mixes a uniform component with weight $u$ and the
/// priority component:
///
/// $$
/// P(i) = \frac{u}{N} + (1 - u) \frac{p_i^\alpha}{\sum_j p_j^\alpha}.
/// $$
///
/// Draws of the priority component are exact: a uniform value in
/// `[0, total)` is located in the sum tree.
pub struct PrioritySampler {
    capacity: usize,
    uniform_probability: f32,
    alpha: f32,
    initial_priority: f32,

    /// Raw priorities, zero for unoccupied slots.
    priorities: Vec<f32>,
    occupied: Vec<bool>,

    /// Occupied slots in order of first write.
    filled: Vec<usize>,

    /// Priorities raised to `alpha`.
    sum_tree: SumTree,
    max_tree: SegmentPoint<f32, MaxIgnoreNaN>,
    iw_scheduler: IwScheduler,
    rng: StdRng,
}

impl PrioritySampler {
    /// Raw priority of slot `idx`.
    pub fn priority(&self, idx: usize) -> Result<f32> {
        check_occupied(&[idx], &self.occupied)?;
        Ok(self.priorities[idx])
    }

    /// Sum of all priorities raised to `alpha`.
    pub fn total(&self) -> f64 {
        self.sum_tree.total()
    }

    /// Current exponent of the ISR weights.
    pub fn beta(&self) -> f32 {
        self.iw_scheduler.beta()
    }

    /// Returns `true` if slot `idx` holds a transition.
    pub fn is_occupied(&self, idx: usize) -> bool {
        self.occupied.get(idx).copied().unwrap_or(false)
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Priority given to a new transition.
    fn new_priority(&self) -> f32 {
        let max_p = self.max_tree.query(0, self.max_tree.len());
        if max_p > 0.0 {
            max_p
        } else {
            self.initial_priority
        }
    }

    /// Probability of drawing slot `idx`.
    fn probability(&self, idx: usize) -> f64 {
        let n = self.filled.len() as f64;
        let u = self.uniform_probability as f64;
        let total = self.sum_tree.total();
        let p = if total > 0.0 {
            self.sum_tree.get(idx) / total
        } else {
            1.0 / n
        };
        u / n + (1.0 - u) * p
    }

    /// Writes raw priorities of already validated slots in one batch.
    pub(super) fn write(&mut self, items: &[(usize, f32)]) {
        for &(idx, p) in items.iter() {
            self.priorities[idx] = p;
            self.max_tree.modify(idx, p);
        }
        let alpha = self.alpha;
        self.sum_tree
            .set_many(items.iter().map(|&(idx, p)| (idx, (p as f64).powf(alpha as f64))));
    }

    /// Writes a validated batch of priorities and advances the ISR schedule.
    pub(super) fn commit(&mut self, items: &[(usize, f32)]) {
        self.write(items);
        self.iw_scheduler.add_n_updates();
    }

    pub(super) fn check_update(&self, idxs: &[usize], priorities: &[f32]) -> Result<()> {
        check_update(idxs, priorities, &self.occupied)
    }
}

impl Sampler for PrioritySampler {
    type Config = PriorityConfig;

    fn build(capacity: usize, config: &Self::Config, seed: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(ReplayError::Configuration(
                "capacity must be positive".to_string(),
            ));
        }
        config.validate()?;

        Ok(Self {
            capacity,
            uniform_probability: config.uniform_probability,
            alpha: config.alpha,
            initial_priority: config.initial_priority,
            priorities: vec![0f32; capacity],
            occupied: vec![false; capacity],
            filled: Vec::with_capacity(capacity),
            sum_tree: SumTree::new(capacity),
            max_tree: SegmentPoint::build(vec![0f32; capacity], MaxIgnoreNaN),
            iw_scheduler: IwScheduler::new(
                config.beta_0,
                config.beta_final,
                config.n_updates_final,
            ),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// The new occupant receives the maximum stored priority, or
    /// `initial_priority` if no positive priority is stored.
    fn replace<O, A>(&mut self, idx: usize, _transition: &LaggedTimestep<O, A>) -> Result<()> {
        check_index(idx, self.capacity)?;
        if !self.occupied[idx] {
            self.occupied[idx] = true;
            self.filled.push(idx);
        }
        // The previous occupant may hold the maximum; drop it first.
        self.max_tree.modify(idx, 0.0);
        let p = self.new_priority();
        self.write(&[(idx, p)]);
        Ok(())
    }

    fn sample(&mut self, n: usize) -> Result<Vec<usize>> {
        if self.filled.is_empty() {
            return Err(ReplayError::Empty);
        }

        let size = self.filled.len();
        let u = self.uniform_probability;
        let total = self.sum_tree.total();
        let ixs = (0..n)
            .map(|_| {
                if total <= 0.0 || self.rng.gen::<f32>() < u {
                    self.filled[self.rng.gen_range(0..size)]
                } else {
                    self.sum_tree.find(self.rng.gen::<f64>() * total)
                }
            })
            .collect();

        Ok(ixs)
    }

    /// The weight of slot $i$ is $(N P(i))^{-\beta}$, divided by the maximum over
    /// `idxs`. A slot that cannot be drawn gets weight 0.
    fn isr_weights(&self, idxs: &[usize]) -> Result<Vec<f32>> {
        check_occupied(idxs, &self.occupied)?;

        let n = self.filled.len() as f64;
        let beta = self.iw_scheduler.beta() as f64;
        let ws = idxs
            .iter()
            .map(|&idx| {
                let p = self.probability(idx);
                if p > 0.0 {
                    (n * p).powf(-beta)
                } else {
                    0.0
                }
            })
            .collect::<Vec<_>>();

        let w_max = ws.iter().fold(0f64, |m, &w| m.max(w));
        if w_max > 0.0 {
            Ok(ws.iter().map(|w| (w / w_max) as f32).collect())
        } else {
            Ok(ws.iter().map(|&w| w as f32).collect())
        }
    }

    fn update(&mut self, idxs: &[usize], priorities: &[f32]) -> Result<()> {
        self.check_update(idxs, priorities)?;
        let items = idxs
            .iter()
            .copied()
            .zip(priorities.iter().copied())
            .collect::<Vec<_>>();
        self.commit(&items);
        Ok(())
    }

    fn len(&self) -> usize {
        self.filled.len()
    }

    fn reset(&mut self) {
        self.priorities.iter_mut().for_each(|p| *p = 0.0);
        self.occupied.iter_mut().for_each(|o| *o = false);
        self.filled.clear();
        self.sum_tree.clear();
        self.max_tree = SegmentPoint::build(vec![0f32; self.capacity], MaxIgnoreNaN);
        self.iw_scheduler.reset();
    }
}
