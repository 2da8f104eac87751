//! The 100-cell stake map and the directive that mutates it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Amount, CellKey, GridError};

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Stake per cell. Absent keys are zero; zero entries are never stored.
///
/// `total` is maintained on every mutation and must always equal the sum of
/// the cell values ([`Grid::verify_total`]).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<CellKey, Amount>",
    into = "BTreeMap<CellKey, Amount>"
)]
pub struct Grid {
    cells: BTreeMap<CellKey, Amount>,
    total: Amount,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grid from (cell, amount) pairs; repeated keys accumulate.
    pub fn from_cells<I>(cells: I) -> Result<Self, GridError>
    where
        I: IntoIterator<Item = (CellKey, Amount)>,
    {
        let mut g = Grid::new();
        for (cell, amount) in cells {
            g.add(cell, amount)?;
        }
        Ok(g)
    }

    /// Stake on `cell` (zero if absent).
    pub fn get(&self, cell: CellKey) -> Amount {
        self.cells.get(&cell).copied().unwrap_or(Amount::ZERO)
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    /// Number of cells carrying a non-zero stake.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Non-zero cells in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (CellKey, Amount)> + '_ {
        self.cells.iter().map(|(k, v)| (*k, *v))
    }

    /// Add `delta` to one cell. The grid is not mutated on error.
    pub fn add(&mut self, cell: CellKey, delta: Amount) -> Result<(), GridError> {
        let next = self.get(cell).checked_add(delta).ok_or(GridError::Overflow)?;
        if next.is_negative() {
            return Err(GridError::NegativeStake { cell, amount: next });
        }
        let total = self.total.checked_add(delta).ok_or(GridError::Overflow)?;
        if next.is_zero() {
            self.cells.remove(&cell);
        } else {
            self.cells.insert(cell, next);
        }
        self.total = total;
        Ok(())
    }

    /// Add every cell of `delta` key-wise, all or nothing.
    pub fn merge(&mut self, delta: &Grid) -> Result<(), GridError> {
        let mut next = self.clone();
        for (cell, amount) in delta.iter() {
            next.add(cell, amount)?;
        }
        *self = next;
        Ok(())
    }

    /// Integrity check: the cached total matches a full recompute.
    pub fn verify_total(&self) -> bool {
        let mut sum = Amount::ZERO;
        for v in self.cells.values() {
            match sum.checked_add(*v) {
                Some(s) => sum = s,
                None => return false,
            }
        }
        sum == self.total
    }
}

impl TryFrom<BTreeMap<CellKey, Amount>> for Grid {
    type Error = GridError;

    fn try_from(cells: BTreeMap<CellKey, Amount>) -> Result<Self, Self::Error> {
        Grid::from_cells(cells)
    }
}

impl From<Grid> for BTreeMap<CellKey, Amount> {
    fn from(g: Grid) -> Self {
        g.cells
    }
}

// ---------------------------------------------------------------------------
// BetDirective
// ---------------------------------------------------------------------------

/// The unpersisted result of parsing one user action: cell deltas, their
/// total, and a description for the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BetDirective {
    deltas: Vec<(CellKey, Amount)>,
    total: Amount,
    description: String,
}

impl BetDirective {
    /// Deltas must be strictly positive; a cell may appear more than once
    /// (each occurrence contributes).
    pub fn new(
        description: impl Into<String>,
        deltas: Vec<(CellKey, Amount)>,
    ) -> Result<Self, GridError> {
        let mut total = Amount::ZERO;
        for (cell, amount) in &deltas {
            if !amount.is_positive() {
                return Err(GridError::NegativeStake {
                    cell: *cell,
                    amount: *amount,
                });
            }
            total = total.checked_add(*amount).ok_or(GridError::Overflow)?;
        }
        Ok(Self {
            deltas,
            total,
            description: description.into(),
        })
    }

    /// Same `amount` on every key.
    pub fn uniform(
        description: impl Into<String>,
        keys: impl IntoIterator<Item = CellKey>,
        amount: Amount,
    ) -> Result<Self, GridError> {
        let deltas = keys.into_iter().map(|k| (k, amount)).collect();
        Self::new(description, deltas)
    }

    pub fn deltas(&self) -> &[(CellKey, Amount)] {
        &self.deltas
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Distinct cells touched.
    pub fn cell_count(&self) -> usize {
        self.to_grid().map(|g| g.len()).unwrap_or(0)
    }

    /// Collapse the deltas into a delta grid (the unit of a ledger merge).
    pub fn to_grid(&self) -> Result<Grid, GridError> {
        Grid::from_cells(self.deltas.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(s: &str) -> CellKey {
        CellKey::parse(s).unwrap()
    }

    #[test]
    fn add_accumulates_and_tracks_total() {
        let mut g = Grid::new();
        g.add(k("12"), Amount::from_units(50)).unwrap();
        g.add(k("12"), Amount::from_units(25)).unwrap();
        g.add(k("99"), Amount::from_units(10)).unwrap();
        assert_eq!(g.get(k("12")), Amount::from_units(75));
        assert_eq!(g.get(k("00")), Amount::ZERO);
        assert_eq!(g.total(), Amount::from_units(85));
        assert!(g.verify_total());
    }

    #[test]
    fn negative_stake_rejected_without_mutation() {
        let mut g = Grid::new();
        g.add(k("12"), Amount::from_units(5)).unwrap();
        let err = g.add(k("12"), Amount::from_units(-6)).unwrap_err();
        assert!(matches!(err, GridError::NegativeStake { .. }));
        assert_eq!(g.get(k("12")), Amount::from_units(5));
        assert_eq!(g.total(), Amount::from_units(5));
    }

    #[test]
    fn zero_cells_are_dropped() {
        let mut g = Grid::new();
        g.add(k("12"), Amount::from_units(5)).unwrap();
        g.add(k("12"), Amount::from_units(-5)).unwrap();
        assert!(g.is_empty());
        assert_eq!(g.total(), Amount::ZERO);
    }

    #[test]
    fn merge_is_all_or_nothing() {
        let mut g = Grid::from_cells([(k("01"), Amount::from_units(1))]).unwrap();
        let bad = Grid {
            cells: [(k("02"), Amount::from_units(5)), (k("01"), Amount::from_units(-3))]
                .into_iter()
                .collect(),
            total: Amount::from_units(2),
        };
        assert!(g.merge(&bad).is_err());
        assert_eq!(g.len(), 1);
        assert_eq!(g.total(), Amount::from_units(1));
    }

    #[test]
    fn serde_round_trip_recomputes_total() {
        let g = Grid::from_cells([
            (k("05"), Amount::from_units(10)),
            (k("42"), Amount::new(2_500_000)),
        ])
        .unwrap();
        let json = serde_json::to_string(&g).unwrap();
        assert_eq!(json, r#"{"05":"10","42":"2.5"}"#);
        let back: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);
        assert_eq!(back.total(), Amount::new(12_500_000));
    }

    #[test]
    fn directive_rejects_non_positive_delta() {
        assert!(BetDirective::new("x", vec![(k("01"), Amount::ZERO)]).is_err());
    }

    #[test]
    fn directive_total_and_grid() {
        let d = BetDirective::new(
            "two cells",
            vec![
                (k("01"), Amount::from_units(5)),
                (k("01"), Amount::from_units(5)),
                (k("02"), Amount::from_units(1)),
            ],
        )
        .unwrap();
        assert_eq!(d.total(), Amount::from_units(11));
        assert_eq!(d.cell_count(), 2);
        assert_eq!(d.to_grid().unwrap().get(k("01")), Amount::from_units(10));
    }
}
