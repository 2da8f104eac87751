//! nbk-settlement
//!
//! Pure settlement and reporting over a snapshot of persisted sheets,
//! declared numbers, client terms and manual adjustments. No I/O and no
//! clock: callers pass dates explicitly.

mod book;
mod error;
mod period;
mod running;
mod terms;

pub use book::{CumulativeRow, PeriodReportRow, SettlementBook, StatementRow};
pub use error::SettlementError;
pub use period::{Period, Scope};
pub use running::RunningBalance;
pub use terms::{ClientTerms, UpperTerms};
