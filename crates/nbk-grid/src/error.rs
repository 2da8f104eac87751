use thiserror::Error;

use crate::{Amount, CellKey};

/// Invariant violations surfaced by the grid model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("invalid cell key '{0}': expected two decimal digits 00..99")]
    InvalidCellKey(String),

    #[error("invalid decimal '{raw}': {reason}")]
    InvalidDecimal { raw: String, reason: &'static str },

    /// A stake on a cell may never drop below zero.
    #[error("stake on cell {cell} would become negative ({amount})")]
    NegativeStake { cell: CellKey, amount: Amount },

    #[error("amount arithmetic overflow")]
    Overflow,
}
