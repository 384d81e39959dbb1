use std::{
    collections::btree_map::{self, BTreeMap},
    mem,
    ops::Index,
};

use rand::Rng;

/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time MDP with one agent
/// and a finite state space and action space.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State;

    /// A representation of an action that an agent can take to affect the environment
    type Action;

    /// Determine if the state is active or terminal
    fn is_active(&self) -> bool;

    /// Update the environment in response to an action taken by an agent, producing a new state and associated reward
    ///
    /// **Returns** `(next_state, reward)`
    fn step(&mut self, action: Self::Action) -> (Self::State, f64);

    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;
}

/// An environment with a finite set of actions
pub trait DiscreteActionSpace: Environment {
    /// Get the available actions for the current state
    ///
    /// The returned vector should never be empty
    fn actions(&self) -> Vec<Self::Action>;

    /// Sample one of the available actions uniformly
    fn random_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Action;
}

/// Named per-episode metrics accumulated by an environment
///
/// Every key registered in [`Report::new`] starts at zero and is reset to zero by [`Report::take`]
#[derive(Debug, Clone)]
pub struct Report {
    keys: Vec<&'static str>,
    data: BTreeMap<&'static str, f64>,
}

impl Report {
    pub fn new(keys: Vec<&'static str>) -> Self {
        let data = zeroed(&keys);
        Self { keys, data }
    }

    /// The registered metric names, in registration order
    pub fn keys(&self) -> &[&'static str] {
        &self.keys
    }

    pub fn entry(&mut self, key: &'static str) -> btree_map::Entry<'_, &'static str, f64> {
        self.data.entry(key)
    }

    /// Take the accumulated values, leaving every metric at zero
    pub fn take(&mut self) -> BTreeMap<&'static str, f64> {
        let fresh = zeroed(&self.keys);
        mem::replace(&mut self.data, fresh)
    }
}

impl Index<&str> for Report {
    type Output = f64;

    fn index(&self, key: &str) -> &Self::Output {
        &self.data[key]
    }
}

fn zeroed(keys: &[&'static str]) -> BTreeMap<&'static str, f64> {
    keys.iter().map(|&k| (k, 0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_accumulates_and_resets() {
        let mut report = Report::new(vec!["steps", "reward"]);
        report.entry("steps").and_modify(|x| *x += 1.0);
        report.entry("steps").and_modify(|x| *x += 1.0);
        report.entry("reward").and_modify(|x| *x -= 0.5);
        report.entry("unknown").and_modify(|x| *x += 1.0);

        assert_eq!(report.keys(), ["steps", "reward"], "Keys keep registration order");
        assert_eq!(report["steps"], 2.0);

        let taken = report.take();
        assert_eq!(taken["reward"], -0.5);
        assert!(!taken.contains_key("unknown"), "Unregistered keys are never created");
        assert_eq!(report["steps"], 0.0, "Report zeroed after take");
    }
}
