use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    assert_interval,
    decay::{self, Decay},
    ds::QTable,
    env::{DiscreteActionSpace, Environment},
    exploration::{Choice, EpsilonGreedy},
    gym::{Action, DroneGrid, GridState, Pos},
    memory::Exp,
};

/// Configuration for the [`QTableAgent`]
#[derive(Debug, Clone)]
pub struct QTableAgentConfig<D: Decay = decay::Step> {
    /// Exploration policy, ticked once per update
    ///
    /// **Default**: epsilon starts at `1.0` and is multiplied by `0.995` after every update, floored at `0.01`
    pub exploration: EpsilonGreedy<D>,
    /// Learning rate
    ///
    /// **Default**: `0.1`
    pub alpha: f64,
    /// Discount factor
    ///
    /// **Default**: `0.9`
    pub gamma: f64,
    /// Seed for the exploration RNG, drawn from the OS when `None`
    ///
    /// **Default**: `None`
    pub seed: Option<u64>,
}

impl Default for QTableAgentConfig {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::new(decay::Step::per_tick(0.995, 1.0, 0.01)),
            alpha: 0.1,
            gamma: 0.9,
            seed: None,
        }
    }
}

/// One transition as seen by a step observer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    /// Zero-based index of the step within its episode
    pub step: usize,
    pub action: Action,
    /// Whether the environment accepted the move
    pub moved: bool,
    pub state: GridState,
    pub reward: f64,
    pub done: bool,
}

/// Totals of one episode
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpisodeSummary {
    pub steps: usize,
    pub total_reward: f64,
    pub reached_target: bool,
}

impl EpisodeSummary {
    fn record(&mut self, reward: f64, done: bool) {
        self.steps += 1;
        self.total_reward += reward;
        self.reached_target = done;
    }
}

/// A Q-learning agent backed by a dense [`QTable`] over drone and target positions
///
/// Epsilon decays on every call to [`learn`](QTableAgent::learn), so exploration falls off
/// with the number of steps taken rather than the number of episodes played.
pub struct QTableAgent<D: Decay = decay::Step> {
    q_table: QTable,
    exploration: EpsilonGreedy<D>,
    alpha: f64,   // learning rate
    gamma: f64,   // discount factor
    updates: u32, // ticks of the exploration schedule
    visits: Vec<u32>,
    rng: StdRng,
}

impl<D: Decay> QTableAgent<D> {
    /// Initialize an agent with a zero-filled table for an `size`x`size` grid
    ///
    /// **Panics** if `alpha` or `gamma` is not in the interval `[0,1]`
    pub fn new(size: usize, config: QTableAgentConfig<D>) -> Self {
        Self::with_q_table(QTable::new(size), config)
    }

    /// Initialize an agent that continues from an existing table
    ///
    /// **Panics** if `alpha` or `gamma` is not in the interval `[0,1]`
    pub fn with_q_table(q_table: QTable, config: QTableAgentConfig<D>) -> Self {
        assert_interval!(config.alpha, 0.0, 1.0);
        assert_interval!(config.gamma, 0.0, 1.0);
        let size = q_table.grid_size();
        Self {
            q_table,
            exploration: config.exploration,
            alpha: config.alpha,
            gamma: config.gamma,
            updates: 0,
            visits: vec![0; size * size],
            rng: match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        }
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn into_q_table(self) -> QTable {
        self.q_table
    }

    /// Current exploration rate
    pub fn epsilon(&self) -> f64 {
        self.exploration.epsilon(self.updates)
    }

    /// Number of updates applied so far
    pub fn updates(&self) -> u32 {
        self.updates
    }

    /// How many times an action was chosen with the drone at `pos`
    pub fn visits(&self, pos: Pos) -> u32 {
        self.visits[self.cell(pos)]
    }

    fn cell(&self, (row, col): Pos) -> usize {
        let n = self.q_table.grid_size();
        assert!(
            row < n && col < n,
            "Position {:?} lies outside a {n}x{n} grid",
            (row, col)
        );
        row * n + col
    }

    /// Choose an action for `state` with the epsilon greedy policy, exploring over the
    /// action space of `env`
    pub fn act(&mut self, env: &DroneGrid, state: &GridState) -> Action {
        let cell = self.cell(state.pos());
        self.visits[cell] += 1;

        match self.exploration.choose(self.updates, &mut self.rng) {
            Choice::Explore => env.random_action(&mut self.rng),
            Choice::Exploit => self.q_table.best_action(state),
        }
    }

    /// Apply the one-step Q-learning update for `experience`, then tick the exploration schedule
    ///
    /// The bootstrap value is read at the drone position of `next_state` under the
    /// target of `state`.
    pub fn learn(&mut self, experience: Exp<DroneGrid>) {
        let Exp {
            state,
            action,
            next_state,
            reward,
        } = experience;

        let q_value = self.q_table.get(&state, action);
        let max_next_q = self.q_table.max(&state.with_pos(next_state.pos()));
        let new_q_value = q_value + self.alpha * (reward + self.gamma * max_next_q - q_value);
        self.q_table.set(&state, action, new_q_value);

        self.updates = self.updates.saturating_add(1);
    }

    /// Run one training episode, stopping at the target or after `max_steps`
    ///
    /// `observe` is called after every update with the transition and the environment
    pub fn go(
        &mut self,
        env: &mut DroneGrid,
        max_steps: Option<usize>,
        mut observe: impl FnMut(&StepRecord, &DroneGrid),
    ) -> EpisodeSummary {
        let mut summary = EpisodeSummary::default();
        let mut state = env.reset();

        while max_steps.map_or(true, |cap| summary.steps < cap) {
            let action = self.act(env, &state);
            let (next_state, reward) = env.step(action);
            let done = !env.is_active();

            self.learn(Exp {
                state,
                action,
                next_state,
                reward,
            });

            let record = StepRecord {
                step: summary.steps,
                action,
                moved: next_state.pos() != state.pos(),
                state: next_state,
                reward,
                done,
            };
            summary.record(reward, done);
            observe(&record, env);

            if done {
                break;
            }
            state = next_state;
        }

        summary
    }
}

/// Settings of a full training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// **Default**: `1000`
    pub episodes: usize,
    /// Step cap per episode, unbounded when `None`
    ///
    /// **Default**: `None`
    pub max_steps: Option<usize>,
    /// Log progress every this many episodes
    ///
    /// **Default**: `50`
    pub log_every: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            episodes: 1000,
            max_steps: None,
            log_every: 50,
        }
    }
}

/// Train `agent` for `config.episodes` episodes
///
/// `observe` receives the episode index alongside every step record
pub fn train<D: Decay>(
    agent: &mut QTableAgent<D>,
    env: &mut DroneGrid,
    config: &TrainConfig,
    mut observe: impl FnMut(usize, &StepRecord, &DroneGrid),
) -> Vec<EpisodeSummary> {
    let log_every = config.log_every.max(1);
    (0..config.episodes)
        .map(|episode| {
            let summary = agent.go(env, config.max_steps, |record, env| {
                observe(episode, record, env)
            });
            let report = env.report.take();
            debug!(
                "Episode {episode}: {} steps, reward {:.2}",
                report["steps"], report["reward"]
            );
            if episode % log_every == 0 {
                info!(
                    "Episode: {episode}, Total Reward: {:.1}, Epsilon: {:.3}",
                    summary.total_reward,
                    agent.epsilon()
                );
            }
            summary
        })
        .collect()
}

/// Replay the greedy policy of `q_table` for one episode without learning
///
/// Stops at the target or after `max_steps`
pub fn play(
    q_table: &QTable,
    env: &mut DroneGrid,
    max_steps: usize,
    mut observe: impl FnMut(&StepRecord, &DroneGrid),
) -> EpisodeSummary {
    let mut summary = EpisodeSummary::default();
    let mut state = env.reset();

    while summary.steps < max_steps {
        let action = q_table.best_action(&state);
        let (next_state, reward) = env.step(action);
        let done = !env.is_active();

        let record = StepRecord {
            step: summary.steps,
            action,
            moved: next_state.pos() != state.pos(),
            state: next_state,
            reward,
            done,
        };
        summary.record(reward, done);
        observe(&record, env);

        if done {
            break;
        }
        state = next_state;
    }

    summary
}
