use std::path::Path;

use strum::VariantArray;

use crate::{
    gym::{Action, GridState},
    npy, Error,
};

/// Dense action-value table over `(row, col, target_row, target_col, action)`
///
/// Values are stored row-major, the same layout numpy uses for an
/// `(n, n, n, n, 4)` array, so a table round-trips through `.npy` unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    size: usize,
    values: Vec<f64>,
}

impl QTable {
    /// Zero-filled table for an `size`x`size` grid
    pub fn new(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; Self::len_for(size)],
        }
    }

    fn len_for(size: usize) -> usize {
        size.pow(4) * Action::VARIANTS.len()
    }

    /// Side length of the grid this table covers
    pub fn grid_size(&self) -> usize {
        self.size
    }

    pub fn shape(&self) -> [usize; 5] {
        Self::shape_for(self.size)
    }

    fn shape_for(n: usize) -> [usize; 5] {
        [n, n, n, n, Action::VARIANTS.len()]
    }

    /// Flat row-major view of every value
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// **Panics** if any coordinate of `state` is outside the grid
    fn offset(&self, state: &GridState) -> usize {
        let n = self.size;
        let coords = [state.row, state.col, state.target_row, state.target_col];
        assert!(
            coords.iter().all(|&c| c < n),
            "State {state:?} lies outside a {n}x{n} Q-table"
        );
        coords.iter().fold(0, |acc, &c| acc * n + c) * Action::VARIANTS.len()
    }

    /// Action values of `state`, indexed by [`Action::index`]
    pub fn values(&self, state: &GridState) -> &[f64] {
        let i = self.offset(state);
        &self.values[i..i + Action::VARIANTS.len()]
    }

    pub fn get(&self, state: &GridState, action: Action) -> f64 {
        self.values(state)[action.index()]
    }

    pub fn set(&mut self, state: &GridState, action: Action, value: f64) {
        let i = self.offset(state) + action.index();
        self.values[i] = value;
    }

    /// Largest action value of `state`
    pub fn max(&self, state: &GridState) -> f64 {
        self.values(state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Highest-valued action of `state`, ties going to the lowest index
    pub fn best_action(&self, state: &GridState) -> Action {
        let values = self.values(state);
        let best = (1..values.len()).fold(0, |best, i| {
            if values[i] > values[best] {
                i
            } else {
                best
            }
        });
        Action::VARIANTS[best]
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        npy::save(path, &self.shape(), &self.values)
    }

    /// Load a table for an `size`x`size` grid
    ///
    /// Any array whose shape is not `(size, size, size, size, 4)` is rejected
    pub fn load(path: impl AsRef<Path>, size: usize) -> Result<Self, Error> {
        let npy::Array { shape, data } = npy::load(path)?;
        let expected = Self::shape_for(size);
        if shape != expected {
            return Err(Error::ShapeMismatch {
                expected: expected.to_vec(),
                found: shape,
            });
        }
        Ok(Self { size, values: data })
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs, path::PathBuf};

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        env::temp_dir().join(format!("drone-rl-{}-{name}.npy", std::process::id()))
    }

    fn state(row: usize, col: usize) -> GridState {
        GridState::new((row, col), (6, 7))
    }

    #[test]
    fn starts_zeroed_with_full_shape() {
        let table = QTable::new(8);
        assert_eq!(table.shape(), [8, 8, 8, 8, 4]);
        assert_eq!(table.as_slice().len(), 8 * 8 * 8 * 8 * 4);
        assert!(table.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn layout_is_row_major() {
        let mut table = QTable::new(8);
        let s = GridState::new((1, 2), (3, 4));
        table.set(&s, Action::Left, 7.0);

        let flat = (((1 * 8 + 2) * 8 + 3) * 8 + 4) * 4 + 2;
        assert_eq!(table.as_slice()[flat], 7.0);
        assert_eq!(table.get(&s, Action::Left), 7.0);
        assert_eq!(table.values(&s), [0.0, 0.0, 7.0, 0.0]);
    }

    #[test]
    fn best_action_takes_first_maximum() {
        let mut table = QTable::new(8);
        let s = state(2, 2);
        assert_eq!(table.best_action(&s), Action::Up, "All zero picks index 0");

        table.set(&s, Action::Down, 1.0);
        table.set(&s, Action::Right, 1.0);
        assert_eq!(table.best_action(&s), Action::Down, "Tie goes to lower index");
        assert_eq!(table.max(&s), 1.0);

        table.set(&s, Action::Up, -3.0);
        table.set(&s, Action::Down, -2.0);
        table.set(&s, Action::Left, -5.0);
        table.set(&s, Action::Right, -2.5);
        assert_eq!(table.best_action(&s), Action::Down);
        assert_eq!(table.max(&s), -2.0, "Max of negative values");
    }

    #[test]
    #[should_panic(expected = "outside a 8x8 Q-table")]
    fn out_of_range_state_panics() {
        QTable::new(8).get(&state(8, 0), Action::Up);
    }

    #[test]
    fn save_load_round_trip_is_bit_identical() {
        let mut table = QTable::new(8);
        for (i, s) in [state(1, 1), state(2, 1), state(5, 7), state(0, 0)].iter().enumerate() {
            table.set(s, Action::VARIANTS[i % 4], 0.1 * (i as f64 + 1.0) - 1.0 / 3.0);
        }

        let path = scratch("round-trip");
        table.save(&path).unwrap();
        let loaded = QTable::load(&path, 8).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded.shape(), [8, 8, 8, 8, 4]);
        let bits = |t: &QTable| t.as_slice().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&loaded), bits(&table));
    }

    #[test]
    fn load_rejects_wrong_shape() {
        let path = scratch("wrong-shape");
        QTable::new(4).save(&path).unwrap();
        let result = QTable::load(&path, 8);
        fs::remove_file(&path).unwrap();

        match result {
            Err(Error::ShapeMismatch { expected, found }) => {
                assert_eq!(expected, [8, 8, 8, 8, 4]);
                assert_eq!(found, [4, 4, 4, 4, 4]);
            }
            other => panic!("Expected a shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn load_surfaces_missing_file() {
        let result = QTable::load(scratch("missing"), 8);
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
