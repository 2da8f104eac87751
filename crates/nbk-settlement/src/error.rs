use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    /// A client has sheets in scope but no terms in the snapshot.
    #[error("unknown client '{0}': sheets exist but no terms are loaded")]
    UnknownClient(String),

    #[error("invalid date range {from} .. {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("invalid month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("amount overflow")]
    Overflow,
}

impl SettlementError {
    pub fn code(&self) -> &'static str {
        match self {
            SettlementError::UnknownClient(_) => "SETTLEMENT_UNKNOWN_CLIENT",
            SettlementError::InvalidRange { .. } | SettlementError::InvalidMonth { .. } => {
                "SETTLEMENT_INVALID_PERIOD"
            }
            SettlementError::Overflow => "SETTLEMENT_OVERFLOW",
        }
    }
}
