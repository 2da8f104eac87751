use std::collections::BTreeSet;

use nbk_grid::CellKey;

use crate::ExpandError;

/// Flags for the cross-product generator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CrossOptions {
    /// Drop keys whose two digits are equal.
    pub remove_self_pairs: bool,
    /// Also emit `b+a` for every `a+b` with `a != b`.
    pub reverse: bool,
}

/// One invocation of the key generator: cross-product or range, never both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeySpec {
    Cross {
        leading: Vec<u8>,
        trailing: Vec<u8>,
        options: CrossOptions,
    },
    Range {
        start: u8,
        end: u8,
    },
}

/// `{a+b : a in A, b in B}` as a deduplicated, ordered key set.
///
/// Input sequences may repeat digits; the output never does. Size is at most
/// `|dedupe(A)| × |dedupe(B)|`, doubled when `reverse` is set.
pub fn cross_product(
    leading: &[u8],
    trailing: &[u8],
    options: CrossOptions,
) -> Result<BTreeSet<CellKey>, ExpandError> {
    let mut out = BTreeSet::new();
    for &a in leading {
        for &b in trailing {
            let key = CellKey::from_digits(a, b).ok_or(ExpandError::InvalidDigit(a.max(b)))?;
            if a == b {
                if !options.remove_self_pairs {
                    out.insert(key);
                }
                continue;
            }
            out.insert(key);
            if options.reverse {
                out.insert(key.reversed());
            }
        }
    }
    Ok(out)
}

/// Every key in `[start, end]`, ascending.
pub fn range(start: u8, end: u8) -> Result<Vec<CellKey>, ExpandError> {
    if start > end || end > 99 {
        return Err(ExpandError::InvalidRange { start, end });
    }
    Ok((start..=end).filter_map(CellKey::from_index).collect())
}

/// Evaluate a [`KeySpec`] into an ordered key list.
pub fn expand(spec: &KeySpec) -> Result<Vec<CellKey>, ExpandError> {
    match spec {
        KeySpec::Cross {
            leading,
            trailing,
            options,
        } => {
            if leading.is_empty() || trailing.is_empty() {
                return Err(ExpandError::NoDigits);
            }
            Ok(cross_product(leading, trailing, *options)?.into_iter().collect())
        }
        KeySpec::Range { start, end } => range(*start, *end),
    }
}
