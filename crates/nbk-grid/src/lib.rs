//! nbk-grid
//!
//! Money and grid model for the numbers book.
//! - `Amount` / `Rate`: 1e-6 fixed-point, no floats anywhere
//! - `CellKey`: one of the 100 cells "00".."99"
//! - `Grid`: cell -> stake map with a total that is never stale
//! - `BetDirective`: one parsed, unpersisted set of cell deltas
//! - `GridTotals`: row / column / grand totals (the grid aggregator)
//!
//! Pure deterministic logic (no IO, no time).

mod amount;
mod cell;
mod error;
mod grid;

pub mod totals;

pub use amount::{parse_micros, Amount, Rate};
pub use cell::CellKey;
pub use error::GridError;
pub use grid::{BetDirective, Grid};
pub use totals::GridTotals;

/// Money / rate scale: micros (1e-6).
pub const MICROS_SCALE: i64 = 1_000_000;

/// Number of cells on a grid.
pub const CELL_COUNT: usize = 100;
