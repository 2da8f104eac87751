//! Grid aggregator: row, column and grand totals.
//!
//! Row `r` is keys `r0..r9`; column `c` is keys `0c..9c`. The aggregator may
//! be kept incrementally ([`GridTotals::apply_delta`]) but must always equal
//! [`GridTotals::compute`] over the same grid.

use serde::{Deserialize, Serialize};

use crate::{Amount, CellKey, Grid};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTotals {
    pub rows: [Amount; 10],
    pub cols: [Amount; 10],
    pub grand: Amount,
}

impl GridTotals {
    /// Full recompute over all 100 cells.
    pub fn compute(grid: &Grid) -> Self {
        let mut t = GridTotals::default();
        for (cell, amount) in grid.iter() {
            t.apply_delta(cell, amount);
        }
        t
    }

    /// Incremental update for one cell delta.
    pub fn apply_delta(&mut self, cell: CellKey, delta: Amount) {
        self.rows[cell.tens() as usize] += delta;
        self.cols[cell.units() as usize] += delta;
        self.grand += delta;
    }

    pub fn row(&self, r: u8) -> Amount {
        self.rows.get(r as usize).copied().unwrap_or(Amount::ZERO)
    }

    pub fn col(&self, c: u8) -> Amount {
        self.cols.get(c as usize).copied().unwrap_or(Amount::ZERO)
    }

    /// `grand == Σ rows == Σ cols`.
    pub fn is_consistent(&self) -> bool {
        let rows: Amount = self.rows.iter().sum();
        let cols: Amount = self.cols.iter().sum();
        rows == self.grand && cols == self.grand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(s: &str) -> CellKey {
        CellKey::parse(s).unwrap()
    }

    #[test]
    fn rows_and_columns_follow_digits() {
        let g = Grid::from_cells([
            (k("12"), Amount::from_units(10)),
            (k("19"), Amount::from_units(5)),
            (k("92"), Amount::from_units(1)),
        ])
        .unwrap();
        let t = GridTotals::compute(&g);
        assert_eq!(t.row(1), Amount::from_units(15));
        assert_eq!(t.row(9), Amount::from_units(1));
        assert_eq!(t.col(2), Amount::from_units(11));
        assert_eq!(t.col(9), Amount::from_units(5));
        assert_eq!(t.grand, Amount::from_units(16));
        assert!(t.is_consistent());
    }

    #[test]
    fn empty_grid_is_all_zero() {
        let t = GridTotals::compute(&Grid::new());
        assert_eq!(t, GridTotals::default());
        assert!(t.is_consistent());
    }
}
