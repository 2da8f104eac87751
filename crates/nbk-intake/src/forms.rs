use nbk_expand::{digit_set, expand, harup, KeySpec};
use nbk_grid::{Amount, BetDirective};

use crate::IntakeError;

/// Structured cross-product or range entry. Every generated key gets
/// `amount`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossForm {
    pub spec: KeySpec,
    pub amount: Amount,
}

impl CrossForm {
    pub fn directive(&self) -> Result<BetDirective, IntakeError> {
        if !self.amount.is_positive() {
            return Err(IntakeError::InvalidForm(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        let keys = expand(&self.spec)?;
        if keys.is_empty() {
            return Err(IntakeError::InvalidForm("no keys generated".to_string()));
        }
        let description = match &self.spec {
            KeySpec::Cross { options, .. } => format!(
                "cross {} keys{}{} @ {}",
                keys.len(),
                if options.remove_self_pairs { " -pairs" } else { "" },
                if options.reverse { " +rev" } else { "" },
                self.amount
            ),
            KeySpec::Range { start, end } => {
                format!("range {start:02}-{end:02} @ {}", self.amount)
            }
        };
        Ok(BetDirective::uniform(description, keys, self.amount)?)
    }
}

/// Half-complement entry. Digit fields are free strings; non-digits are
/// ignored and repeats collapse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarupForm {
    pub leading: String,
    pub trailing: String,
    pub amount: Amount,
}

impl HarupForm {
    pub fn directive(&self) -> Result<BetDirective, IntakeError> {
        let leading = digit_set(&self.leading);
        let trailing = digit_set(&self.trailing);
        let deltas = harup(&leading, &trailing, self.amount)?;
        let description = format!(
            "harup A[{}] B[{}] @ {}",
            join_digits(&leading),
            join_digits(&trailing),
            self.amount
        );
        Ok(BetDirective::new(description, deltas)?)
    }
}

fn join_digits<'a>(digits: impl IntoIterator<Item = &'a u8>) -> String {
    digits.into_iter().map(|d| char::from(b'0' + d)).collect()
}

#[cfg(test)]
mod tests {
    use nbk_expand::CrossOptions;
    use nbk_grid::CellKey;

    use super::*;

    #[test]
    fn cross_form_stakes_every_key() {
        let form = CrossForm {
            spec: KeySpec::Cross {
                leading: vec![1, 2],
                trailing: vec![3, 4],
                options: CrossOptions::default(),
            },
            amount: Amount::from_units(10),
        };
        let d = form.directive().unwrap();
        assert_eq!(d.cell_count(), 4);
        assert_eq!(d.total(), Amount::from_units(40));
    }

    #[test]
    fn range_form() {
        let form = CrossForm {
            spec: KeySpec::Range { start: 10, end: 19 },
            amount: Amount::from_units(5),
        };
        let d = form.directive().unwrap();
        assert_eq!(d.cell_count(), 10);
        assert_eq!(d.total(), Amount::from_units(50));
        assert_eq!(d.description(), "range 10-19 @ 5");
    }

    #[test]
    fn cross_form_rejects_zero_amount() {
        let form = CrossForm {
            spec: KeySpec::Range { start: 0, end: 1 },
            amount: Amount::ZERO,
        };
        assert!(matches!(form.directive(), Err(IntakeError::InvalidForm(_))));
    }

    #[test]
    fn harup_total_counts_overlap_twice() {
        let form = HarupForm {
            leading: "1".to_string(),
            trailing: "1".to_string(),
            amount: Amount::from_units(100),
        };
        let d = form.directive().unwrap();
        assert_eq!(d.total(), Amount::from_units(200));
        let grid = d.to_grid().unwrap();
        assert_eq!(grid.get(CellKey::parse("11").unwrap()), Amount::from_units(20));
        assert_eq!(grid.len(), 19);
    }

    #[test]
    fn harup_needs_divisible_amount() {
        let form = HarupForm {
            leading: "5".to_string(),
            trailing: String::new(),
            amount: Amount::new(15),
        };
        assert!(matches!(form.directive(), Err(IntakeError::Expand(_))));
    }
}
