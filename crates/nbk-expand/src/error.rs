use nbk_grid::Amount;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("digit {0} is not a single decimal digit")]
    InvalidDigit(u8),

    #[error("invalid range {start:02}..{end:02}: bounds must satisfy 00 <= start <= end <= 99")]
    InvalidRange { start: u8, end: u8 },

    #[error("no digits supplied")]
    NoDigits,

    /// Compact notation count matched neither acceptable value.
    #[error(
        "count {declared} does not fit digits '{digits}': expected {with_self_pairs} \
         (with self-pairs) or {without_self_pairs} (without self-pairs)"
    )]
    CountMismatch {
        digits: String,
        declared: usize,
        with_self_pairs: usize,
        without_self_pairs: usize,
    },

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Amount),

    /// Half-complement splits the amount over ten cells; the split must be exact.
    #[error("amount {0} cannot be split evenly over 10 cells")]
    IndivisibleAmount(Amount),

    #[error("amount arithmetic overflow")]
    Overflow,
}
