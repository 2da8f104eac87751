use nbk_grid::{Amount, Rate};
use nbk_schemas::Client;
use serde::{Deserialize, Serialize};

use crate::SettlementError;

/// Commission and payout terms for one side of the book.
///
/// `payable = game_total × (100 − commission_pct)/100 − passing × pair_rate`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTerms {
    pub pair_rate: Rate,
    pub commission_pct: Rate,
}

impl ClientTerms {
    pub fn payable(&self, game_total: Amount, passing: Amount) -> Result<Amount, SettlementError> {
        let retained = game_total
            .after_commission(self.commission_pct)
            .ok_or(SettlementError::Overflow)?;
        let paid = passing
            .mul_rate(self.pair_rate)
            .ok_or(SettlementError::Overflow)?;
        retained.checked_sub(paid).ok_or(SettlementError::Overflow)
    }
}

impl From<&Client> for ClientTerms {
    fn from(c: &Client) -> Self {
        Self {
            pair_rate: c.pair_rate,
            commission_pct: c.commission_pct,
        }
    }
}

/// Terms the broker has with the upstream book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpperTerms {
    pub commission_pct: Rate,
    pub pair_rate: Rate,
}

impl UpperTerms {
    pub fn as_terms(&self) -> ClientTerms {
        ClientTerms {
            pair_rate: self.pair_rate,
            commission_pct: self.commission_pct,
        }
    }
}

impl Default for UpperTerms {
    fn default() -> Self {
        Self {
            commission_pct: Rate::from_units(20),
            pair_rate: Rate::from_units(80),
        }
    }
}
