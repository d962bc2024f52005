//! Conversion of a timestep stream into n-step transitions.
//!
//! A [`LagBuffer`] holds back every step until `lag` further steps have been seen,
//! then resolves it into a [`LaggedTimestep`] whose return and discount are
//! accumulated over the window `t, ..., t + lag - 1`:
//!
//! $$
//! R_t = \sum_{i=0}^{\mathrm{lag}-1} r_{t+i} \Gamma_i, \quad
//! \Gamma_i = \prod_{j \le i} \gamma_{t+j}.
//! $$
//!
//! The step `t + lag` becomes the "next" step of the transition. A terminal step
//! closes every open window at once, so that no window covers two episodes.
use crate::{Eid, LaggedTimestep, Metadata, ReplayError, Result, Timestep};
use log::debug;
use std::collections::VecDeque;

/// Part of a buffered step needed once it becomes the origin of a transition.
struct Entry<O, A> {
    eid: Eid,
    obs: O,
    act: A,
    meta: Option<Metadata>,
}

/// Accumulates `(R, Γ)` over a window, oldest step first.
fn accumulate(rewards: &[f32], gammas: &[f32]) -> (f32, f32) {
    let mut ret = 0f32;
    let mut disc = 1f32;
    for (r, g) in rewards.iter().zip(gammas.iter()) {
        disc *= g;
        ret += r * disc;
    }
    (ret, disc)
}

/// Ring of the last `lag + 1` steps of the current episode.
pub struct LagBuffer<O, A> {
    lag: usize,
    rewards: Vec<f32>,
    gammas: Vec<f32>,
    entries: Vec<Option<Entry<O, A>>>,

    /// Steps added since the last reset.
    n: usize,
}

impl<O, A> LagBuffer<O, A> {
    /// Creates a buffer resolving `lag`-step transitions.
    pub fn new(lag: usize) -> Result<Self> {
        if lag == 0 {
            return Err(ReplayError::Configuration(
                "lag must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            lag,
            rewards: vec![0.; lag + 1],
            gammas: vec![0.; lag + 1],
            entries: (0..=lag).map(|_| None).collect(),
            n: 0,
        })
    }

    /// Number of steps of the current episode whose window is still open.
    pub fn len(&self) -> usize {
        self.n.min(self.lag)
    }

    /// Returns `true` if no window is open.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Length of the window.
    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Discards every open window without emitting it.
    pub fn flush(&mut self) {
        if self.n > 0 {
            debug!("Discard {} open windows", self.len());
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.entries.iter_mut().for_each(|e| *e = None);
        self.n = 0;
    }
}

impl<O: Clone, A> LagBuffer<O, A> {
    /// Adds a step and returns the transitions it resolves.
    ///
    /// A non-terminal step resolves at most the oldest buffered step, and only once
    /// `lag` steps precede it. A terminal step additionally resolves every other
    /// open window, oldest first, and empties the buffer. The terminal step itself
    /// is never the origin of a transition and its `eid` is not exposed; its
    /// reward and discount fall outside every window.
    ///
    /// The step is rejected without touching the buffer if its reward is not
    /// finite or its discount lies outside `[0, 1]`.
    pub fn add(&mut self, eid: Eid, step: Timestep<O, A>) -> Result<LaggedSteps<O, A>> {
        if !step.reward.is_finite() {
            return Err(ReplayError::ContractViolation(format!(
                "reward of eid {} is not finite: {}",
                eid, step.reward
            )));
        }
        if !(0.0..=1.0).contains(&step.gamma) {
            return Err(ReplayError::ContractViolation(format!(
                "discount of eid {} is outside [0, 1]: {}",
                eid, step.gamma
            )));
        }

        let ring = self.lag + 1;
        let open = self.len();
        let pos = self.n % ring;
        self.rewards[pos] = step.reward;
        self.gammas[pos] = step.gamma;
        self.n += 1;

        let n_emit = if step.is_terminal {
            open
        } else if open == self.lag {
            1
        } else {
            0
        };

        // Steps first..last are the origins of the open windows.
        let last = self.n - 1;
        let first = last - open;
        let rewards = (first..last).map(|t| self.rewards[t % ring]).collect();
        let gammas = (first..last).map(|t| self.gammas[t % ring]).collect();
        let origins = (first..first + n_emit)
            .filter_map(|t| self.entries[t % ring].take())
            .collect::<VecDeque<_>>();

        let Timestep {
            obs,
            act,
            meta,
            is_terminal,
            ..
        } = step;

        let next_eid = if is_terminal {
            debug!(
                "Episode terminated at eid {}, resolve {} windows",
                eid, n_emit
            );
            self.reset();
            None
        } else {
            self.entries[pos] = Some(Entry {
                eid,
                obs: obs.clone(),
                act,
                meta,
            });
            Some(eid)
        };

        Ok(LaggedSteps {
            origins,
            rewards,
            gammas,
            offset: 0,
            is_terminal,
            next_eid,
            next_obs: obs,
        })
    }
}

/// Transitions resolved by a single [`LagBuffer::add()`] call.
///
/// The returns are accumulated lazily as the iterator advances. The iterator owns
/// everything it needs, so the buffer can be used again before it is consumed.
pub struct LaggedSteps<O, A> {
    origins: VecDeque<Entry<O, A>>,

    /// Rewards and discounts from the first origin up to the step before "next".
    rewards: Vec<f32>,
    gammas: Vec<f32>,

    /// Position of the next origin in `rewards`.
    offset: usize,

    is_terminal: bool,
    next_eid: Option<Eid>,
    next_obs: O,
}

impl<O: Clone, A> Iterator for LaggedSteps<O, A> {
    type Item = LaggedTimestep<O, A>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.origins.pop_front()?;
        let (reward, gamma) = accumulate(&self.rewards[self.offset..], &self.gammas[self.offset..]);
        self.offset += 1;

        Some(LaggedTimestep {
            eid: entry.eid,
            obs: entry.obs,
            act: entry.act,
            reward,
            gamma,
            meta: entry.meta,
            is_terminal: self.is_terminal,
            next_eid: self.next_eid,
            next_obs: self.next_obs.clone(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.origins.len(), Some(self.origins.len()))
    }
}

impl<O: Clone, A> ExactSizeIterator for LaggedSteps<O, A> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(t: usize, reward: f32, gamma: f32) -> Timestep<usize, i64> {
        Timestep::new(t, t as i64 * 10, reward, gamma)
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{} != {}", a, b);
    }

    #[test]
    fn test_short_run_emits_nothing() -> Result<()> {
        let mut buffer = LagBuffer::new(3)?;
        for t in 0..3 {
            assert_eq!(buffer.add(t as Eid, step(t, 1.0, 0.9))?.count(), 0);
        }
        assert_eq!(buffer.len(), 3);
        Ok(())
    }

    #[test]
    fn test_full_window() -> Result<()> {
        let mut buffer = LagBuffer::new(3)?;
        let rewards = [1.0, 2.0, 3.0, 4.0, 5.0];
        let gammas = [0.9, 0.8, 0.5, 1.0, 0.7];
        let mut out = vec![];
        for t in 0..5 {
            out.extend(buffer.add(t as Eid, step(t, rewards[t], gammas[t]))?);
        }

        assert_eq!(out.len(), 2);
        let tr = &out[0];
        assert_eq!(tr.eid, 0);
        assert_eq!(tr.obs, 0);
        assert_eq!(tr.act, 0);
        assert_close(tr.reward, 1.0 * 0.9 + 2.0 * 0.72 + 3.0 * 0.36);
        assert_close(tr.gamma, 0.36);
        assert!(!tr.is_terminal);
        assert_eq!(tr.next_eid, Some(3));
        assert_eq!(tr.next_obs, 3);

        let tr = &out[1];
        assert_eq!(tr.eid, 1);
        assert_close(tr.reward, 2.0 * 0.8 + 3.0 * 0.4 + 4.0 * 0.4);
        assert_close(tr.gamma, 0.4);
        assert_eq!(tr.next_eid, Some(4));
        Ok(())
    }

    #[test]
    fn test_lag_one() -> Result<()> {
        let mut buffer = LagBuffer::new(1)?;
        assert_eq!(buffer.add(0, step(0, 2.0, 0.5))?.count(), 0);
        let out = buffer.add(1, step(1, 3.0, 0.5))?.collect::<Vec<_>>();
        assert_eq!(out.len(), 1);
        assert_close(out[0].reward, 1.0);
        assert_close(out[0].gamma, 0.5);
        assert_eq!(out[0].next_eid, Some(1));
        Ok(())
    }

    #[test]
    fn test_short_episode_is_flushed() -> Result<()> {
        let mut buffer = LagBuffer::new(5)?;
        for t in 0..3 {
            assert_eq!(buffer.add(t as Eid, step(t, 1.0, 0.5))?.count(), 0);
        }
        let out = buffer
            .add(3, step(3, 100.0, 0.0).terminal(true))?
            .collect::<Vec<_>>();

        assert_eq!(out.iter().map(|tr| tr.eid).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_close(out[0].reward, 0.5 + 0.25 + 0.125);
        assert_close(out[0].gamma, 0.125);
        assert_close(out[1].reward, 0.5 + 0.25);
        assert_close(out[1].gamma, 0.25);
        assert_close(out[2].reward, 0.5);
        assert_close(out[2].gamma, 0.5);
        for tr in out.iter() {
            assert!(tr.is_terminal);
            assert_eq!(tr.next_eid, None);
            assert_eq!(tr.next_obs, 3);
        }

        assert!(buffer.is_empty());
        buffer.flush();
        assert!(buffer.is_empty());
        Ok(())
    }

    #[test]
    fn test_long_episode_is_flushed() -> Result<()> {
        let mut buffer = LagBuffer::new(2)?;
        let mut counts = vec![];
        for t in 0..4 {
            counts.push(buffer.add(t as Eid, step(t, 1.0, 1.0))?.len());
        }
        assert_eq!(counts, vec![0, 0, 1, 1]);

        let out = buffer
            .add(4, step(4, 0.0, 1.0).terminal(true))?
            .collect::<Vec<_>>();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].eid, 2);
        assert_close(out[0].reward, 2.0);
        assert_eq!(out[1].eid, 3);
        assert_close(out[1].reward, 1.0);
        assert!(out.iter().all(|tr| tr.is_terminal && tr.next_eid.is_none()));

        // The next episode starts from scratch.
        assert_eq!(buffer.add(5, step(5, 1.0, 1.0))?.count(), 0);
        assert_eq!(buffer.add(6, step(6, 1.0, 1.0))?.count(), 0);
        assert_eq!(buffer.add(7, step(7, 1.0, 1.0))?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_terminal_first_step() -> Result<()> {
        let mut buffer = LagBuffer::new(2)?;
        assert_eq!(buffer.add(0, step(0, 1.0, 1.0).terminal(true))?.count(), 0);
        assert!(buffer.is_empty());
        Ok(())
    }

    #[test]
    fn test_flush_discards_windows() -> Result<()> {
        let mut buffer = LagBuffer::new(2)?;
        buffer.add(0, step(0, 1.0, 1.0))?.count();
        buffer.add(1, step(1, 1.0, 1.0))?.count();
        buffer.flush();
        assert!(buffer.is_empty());
        assert_eq!(buffer.add(2, step(2, 1.0, 1.0).terminal(true))?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_invalid_step_is_rejected() -> Result<()> {
        let mut buffer = LagBuffer::new(2)?;
        buffer.add(0, step(0, 1.0, 1.0))?.count();

        let err = buffer.add(1, step(1, f32::NAN, 1.0)).err();
        assert!(matches!(err, Some(ReplayError::ContractViolation(_))));
        let err = buffer.add(1, step(1, f32::INFINITY, 1.0)).err();
        assert!(matches!(err, Some(ReplayError::ContractViolation(_))));
        let err = buffer.add(1, step(1, 1.0, 1.5)).err();
        assert!(matches!(err, Some(ReplayError::ContractViolation(_))));
        assert_eq!(buffer.len(), 1);

        assert!(LagBuffer::<usize, i64>::new(0).is_err());
        Ok(())
    }
}
