use std::collections::{BTreeSet, HashMap};

use rand::Rng;
use strum::{Display, FromRepr, VariantArray};

use crate::{
    env::{DiscreteActionSpace, Environment, Report},
    Error,
};

/// Grid coordinates as `(row, col)`
pub type Pos = (usize, usize);

/// The four compass moves, numbered to match the last axis of a [`QTable`](crate::ds::QTable)
#[derive(VariantArray, FromRepr, Display, Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Action {
    /// `(row, col)` offset of the move
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
            Action::Right => (0, 1),
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::VARIANTS[rng.gen_range(0..Self::VARIANTS.len())]
    }
}

/// Full observation handed to the agent: drone position followed by target position
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct GridState {
    pub row: usize,
    pub col: usize,
    pub target_row: usize,
    pub target_col: usize,
}

impl GridState {
    pub fn new(pos: Pos, target: Pos) -> Self {
        Self {
            row: pos.0,
            col: pos.1,
            target_row: target.0,
            target_col: target.1,
        }
    }

    pub fn pos(&self) -> Pos {
        (self.row, self.col)
    }

    pub fn target(&self) -> Pos {
        (self.target_row, self.target_col)
    }

    /// Same target, drone moved to `pos`
    pub fn with_pos(self, pos: Pos) -> Self {
        Self::new(pos, self.target())
    }
}

impl From<GridState> for (usize, usize, usize, usize) {
    fn from(s: GridState) -> Self {
        (s.row, s.col, s.target_row, s.target_col)
    }
}

/// What the drone's current cell means for the episode
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    /// Drone sits on the target
    Terminal,
    /// Drone sits on an obstacle. Move rejection keeps this out of reach on a [`DroneGrid`]
    Collision,
    /// Any other cell
    Step {
        /// Euclidean distance to the target
        distance: f64,
        /// Occurrences of the cell in the path history, current occupancy included
        visits: u32,
    },
}

/// Constants of the shaped reward signal
#[derive(Clone, Debug, PartialEq)]
pub struct RewardShaping {
    pub goal: f64,
    pub collision: f64,
    pub step_cost: f64,
    /// Multiplier applied to the distance to the target
    pub distance_weight: f64,
    /// Bonus for a cell seen fewer than `novelty_limit` times
    pub novelty_bonus: f64,
    pub novelty_limit: u32,
    /// Multiplier applied to the visit count once the cell is no longer novel
    pub revisit_weight: f64,
}

impl Default for RewardShaping {
    fn default() -> Self {
        Self {
            goal: 100.0,
            collision: -50.0,
            step_cost: -0.2,
            distance_weight: -0.5,
            novelty_bonus: 0.5,
            novelty_limit: 2,
            revisit_weight: -0.3,
        }
    }
}

impl RewardShaping {
    pub fn price(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Terminal => self.goal,
            Outcome::Collision => self.collision,
            Outcome::Step { distance, visits } => {
                let exploration = if visits < self.novelty_limit {
                    self.novelty_bonus
                } else {
                    self.revisit_weight * visits as f64
                };
                distance * self.distance_weight + self.step_cost + exploration
            }
        }
    }
}

/// Geometry and reward constants of a [`DroneGrid`]
#[derive(Clone, Debug, PartialEq)]
pub struct DroneGridConfig {
    /// Side length of the square grid
    pub size: usize,
    pub start: Pos,
    pub target: Pos,
    pub obstacles: BTreeSet<Pos>,
    pub shaping: RewardShaping,
}

impl Default for DroneGridConfig {
    fn default() -> Self {
        Self {
            size: 8,
            start: (1, 1),
            target: (6, 7),
            obstacles: BTreeSet::from([(3, 3), (4, 5), (6, 2), (7, 1), (3, 7), (1, 0)]),
            shaping: RewardShaping::default(),
        }
    }
}

impl DroneGridConfig {
    fn validate(&self) -> Result<(), Error> {
        if self.size == 0 {
            return Err(Error::EmptyGrid);
        }

        let cells = [("start", self.start), ("target", self.target)];
        let obstacles = self.obstacles.iter().map(|&pos| ("obstacle", pos));
        for (what, pos) in cells.into_iter().chain(obstacles) {
            if pos.0 >= self.size || pos.1 >= self.size {
                return Err(Error::OutOfBounds {
                    what,
                    pos,
                    size: self.size,
                });
            }
        }

        for (what, pos) in cells {
            if self.obstacles.contains(&pos) {
                return Err(Error::Blocked { what, pos });
            }
        }

        Ok(())
    }
}

/// A drone flying over a square grid towards a fixed target, blocked by walls and obstacles
///
/// Moves into a wall or an obstacle are rejected without penalty of their own; the
/// shaped [reward](DroneGrid::reward) is what teaches the agent to stop trying them.
#[derive(Debug)]
pub struct DroneGrid {
    config: DroneGridConfig,
    pos: Pos,
    path: Vec<Pos>,
    visits: HashMap<Pos, u32>,
    pub report: Report,
}

impl DroneGrid {
    pub fn new(config: DroneGridConfig) -> Result<Self, Error> {
        config.validate()?;
        let start = config.start;
        Ok(Self {
            config,
            pos: start,
            path: vec![start],
            visits: HashMap::from([(start, 1)]),
            report: Report::new(vec!["reward", "steps"]),
        })
    }

    pub fn config(&self) -> &DroneGridConfig {
        &self.config
    }

    pub fn grid_size(&self) -> usize {
        self.config.size
    }

    pub fn start(&self) -> Pos {
        self.config.start
    }

    pub fn target(&self) -> Pos {
        self.config.target
    }

    pub fn obstacles(&self) -> &BTreeSet<Pos> {
        &self.config.obstacles
    }

    /// Current drone position
    pub fn pos(&self) -> Pos {
        self.pos
    }

    /// Every cell occupied since the last reset, oldest first
    pub fn path(&self) -> &[Pos] {
        &self.path
    }

    /// Number of times `pos` appears in the path history
    pub fn visits(&self, pos: Pos) -> u32 {
        self.visits.get(&pos).copied().unwrap_or(0)
    }

    pub fn is_obstacle(&self, pos: Pos) -> bool {
        self.config.obstacles.contains(&pos)
    }

    pub fn is_terminal(&self) -> bool {
        self.pos == self.config.target
    }

    pub fn observe(&self) -> GridState {
        GridState::new(self.pos, self.config.target)
    }

    /// Attempt to move the drone one cell
    ///
    /// **Returns** `false` and leaves position and path untouched if the move would leave
    /// the grid or land on an obstacle
    pub fn move_drone(&mut self, action: Action) -> bool {
        let Some(next) = self.neighbor(self.pos, action) else {
            return false;
        };
        if self.is_obstacle(next) {
            return false;
        }

        self.pos = next;
        self.path.push(next);
        *self.visits.entry(next).or_insert(0) += 1;
        true
    }

    /// Classify the current cell
    pub fn outcome(&self) -> Outcome {
        if self.is_terminal() {
            Outcome::Terminal
        } else if self.is_obstacle(self.pos) {
            Outcome::Collision
        } else {
            Outcome::Step {
                distance: distance(self.pos, self.config.target),
                visits: self.visits(self.pos),
            }
        }
    }

    /// Shaped reward for the current cell and path history
    pub fn reward(&self) -> f64 {
        self.config.shaping.price(self.outcome())
    }

    fn neighbor(&self, pos: Pos, action: Action) -> Option<Pos> {
        let (dr, dc) = action.delta();
        let row = pos.0.checked_add_signed(dr)?;
        let col = pos.1.checked_add_signed(dc)?;
        (row < self.config.size && col < self.config.size).then_some((row, col))
    }
}

impl Environment for DroneGrid {
    type State = GridState;
    type Action = Action;

    fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    fn step(&mut self, action: Self::Action) -> (Self::State, f64) {
        self.report.entry("steps").and_modify(|x| *x += 1.0);

        self.move_drone(action);
        let reward = self.reward();

        self.report.entry("reward").and_modify(|x| *x += reward);
        (self.observe(), reward)
    }

    fn reset(&mut self) -> Self::State {
        let start = self.config.start;
        self.pos = start;
        self.path.clear();
        self.path.push(start);
        self.visits.clear();
        self.visits.insert(start, 1);
        self.observe()
    }
}

impl DiscreteActionSpace for DroneGrid {
    fn actions(&self) -> Vec<Self::Action> {
        Action::VARIANTS.to_vec()
    }

    fn random_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Action {
        Action::random(rng)
    }
}

fn distance(a: Pos, b: Pos) -> f64 {
    let dr = a.0 as f64 - b.0 as f64;
    let dc = a.1 as f64 - b.1 as f64;
    (dr * dr + dc * dc).sqrt()
}
