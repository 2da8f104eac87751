//! Structural validation for the compact `digits=count=amount` notation.
//!
//! With `u` distinct digits the cross-product of the digit set with itself
//! has `u×u` keys including self-pairs and `u×(u-1)` without. The declared
//! count selects which; any other count rejects the entry before a single
//! key is generated.

use std::collections::BTreeSet;

use nbk_grid::CellKey;

use crate::{cross_product, digit_set, CrossOptions, ExpandError};

/// Whether a compact entry includes self-paired cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelfPairs {
    Included,
    Excluded,
}

/// The two acceptable counts for a digit string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompactCounts {
    pub unique: usize,
    pub with_self_pairs: usize,
    pub without_self_pairs: usize,
}

impl CompactCounts {
    pub fn of(digits: &BTreeSet<u8>) -> Self {
        let u = digits.len();
        Self {
            unique: u,
            with_self_pairs: u * u,
            without_self_pairs: u * u.saturating_sub(1),
        }
    }

    /// Which self-pair rule a declared count selects, if any.
    pub fn classify(&self, declared: usize) -> Option<SelfPairs> {
        if declared == self.with_self_pairs {
            Some(SelfPairs::Included)
        } else if declared == self.without_self_pairs {
            Some(SelfPairs::Excluded)
        } else {
            None
        }
    }
}

/// Acceptable counts for the distinct digits of `digits`.
pub fn compact_counts(digits: &str) -> CompactCounts {
    CompactCounts::of(&digit_set(digits))
}

/// Validate `declared` against `digits` and generate the keys.
pub fn compact_keys(digits: &str, declared: usize) -> Result<BTreeSet<CellKey>, ExpandError> {
    let set = digit_set(digits);
    if set.is_empty() {
        return Err(ExpandError::NoDigits);
    }
    let counts = CompactCounts::of(&set);
    let rule = counts
        .classify(declared)
        .ok_or_else(|| ExpandError::CountMismatch {
            digits: digits.to_string(),
            declared,
            with_self_pairs: counts.with_self_pairs,
            without_self_pairs: counts.without_self_pairs,
        })?;

    let digits: Vec<u8> = set.into_iter().collect();
    let options = CrossOptions {
        remove_self_pairs: rule == SelfPairs::Excluded,
        reverse: false,
    };
    cross_product(&digits, &digits, options)
}
