use rand::Rng;

use crate::decay::Decay;

use super::Choice;

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self { epsilon: decay }
    }

    /// Exploration rate after `t` ticks of the decay schedule
    pub fn epsilon(&self, t: u32) -> f64 {
        self.epsilon.evaluate(t as f64)
    }

    /// Explore with probability `epsilon(t)`, exploit otherwise
    pub fn choose<R: Rng + ?Sized>(&self, t: u32, rng: &mut R) -> Choice {
        if rng.gen::<f64>() < self.epsilon(t) {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::decay::{Constant, Step};

    #[test]
    fn extreme_epsilons_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(0);
        let greedy = EpsilonGreedy::new(Constant::new(0.0));
        let random = EpsilonGreedy::new(Constant::new(1.0));
        for t in 0..100 {
            assert_eq!(greedy.choose(t, &mut rng), Choice::Exploit);
            assert_eq!(random.choose(t, &mut rng), Choice::Explore);
        }
    }

    #[test]
    fn epsilon_follows_schedule() {
        let policy = EpsilonGreedy::new(Step::per_tick(0.5, 1.0, 0.1));
        assert_eq!(policy.epsilon(0), 1.0);
        assert_eq!(policy.epsilon(1), 0.5);
        assert_eq!(policy.epsilon(2), 0.25);
        assert_eq!(policy.epsilon(5), 0.1);
    }
}
