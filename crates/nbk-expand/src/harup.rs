use std::collections::BTreeSet;

use nbk_grid::{Amount, CellKey};

use crate::ExpandError;

/// Half-complement expansion.
///
/// Each leading digit `d` stakes `amount / 10` on `d0..d9`; each trailing
/// digit `d` stakes `amount / 10` on `0d..9d`. Overlapping cells appear once
/// per contributing digit, so the deltas always sum to
/// `amount × (|leading| + |trailing|)`.
pub fn harup(
    leading: &BTreeSet<u8>,
    trailing: &BTreeSet<u8>,
    amount: Amount,
) -> Result<Vec<(CellKey, Amount)>, ExpandError> {
    if leading.is_empty() && trailing.is_empty() {
        return Err(ExpandError::NoDigits);
    }
    if !amount.is_positive() {
        return Err(ExpandError::NonPositiveAmount(amount));
    }
    let per_cell = amount
        .checked_div_exact(10)
        .ok_or(ExpandError::IndivisibleAmount(amount))?;

    let mut out = Vec::with_capacity((leading.len() + trailing.len()) * 10);
    for &d in leading {
        for u in 0..10 {
            let key = CellKey::from_digits(d, u).ok_or(ExpandError::InvalidDigit(d))?;
            out.push((key, per_cell));
        }
    }
    for &d in trailing {
        for t in 0..10 {
            let key = CellKey::from_digits(t, d).ok_or(ExpandError::InvalidDigit(d))?;
            out.push((key, per_cell));
        }
    }
    Ok(out)
}

/// The amount a half-complement entry must be validated against.
pub fn harup_total(
    leading: &BTreeSet<u8>,
    trailing: &BTreeSet<u8>,
    amount: Amount,
) -> Option<Amount> {
    amount.checked_mul_count(leading.len() + trailing.len())
}
