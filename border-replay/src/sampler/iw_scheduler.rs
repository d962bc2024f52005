//! Scheduling the exponent of the ISR weights.
use serde::{Deserialize, Serialize};

/// Linear schedule of the exponent $\beta$ of the ISR weights
/// $w_i = (N P(i))^{-\beta}$.
///
/// $\beta$ moves from `beta_0` to `beta_final` over `n_updates_final` priority
/// updates and stays there.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct IwScheduler {
    /// Initial value of $\beta$.
    pub beta_0: f32,

    /// Final value of $\beta$.
    pub beta_final: f32,

    /// Priority updates when beta reaches its final value.
    pub n_updates_final: usize,

    /// Priority updates so far.
    pub n_updates: usize,
}

impl IwScheduler {
    /// Creates a scheduler.
    pub fn new(beta_0: f32, beta_final: f32, n_updates_final: usize) -> Self {
        Self {
            beta_0,
            beta_final,
            n_updates_final,
            n_updates: 0,
        }
    }

    /// Current exponent of the ISR weights.
    pub fn beta(&self) -> f32 {
        if self.n_updates >= self.n_updates_final {
            self.beta_final
        } else {
            let d = self.beta_final - self.beta_0;
            self.beta_0 + d * (self.n_updates as f32 / self.n_updates_final as f32)
        }
    }

    /// Counts a priority update.
    pub fn add_n_updates(&mut self) {
        self.n_updates += 1;
    }

    /// Rewinds the schedule.
    pub fn reset(&mut self) {
        self.n_updates = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::IwScheduler;

    #[test]
    fn test_linear_schedule() {
        let mut scheduler = IwScheduler::new(0.4, 1.0, 4);
        let mut betas = vec![];
        for _ in 0..6 {
            betas.push(scheduler.beta());
            scheduler.add_n_updates();
        }
        let expected = [0.4, 0.55, 0.7, 0.85, 1.0, 1.0];
        for (b, e) in betas.iter().zip(expected.iter()) {
            assert!((b - e).abs() < 1e-6);
        }

        scheduler.reset();
        assert!((scheduler.beta() - 0.4).abs() < 1e-6);
    }
}
