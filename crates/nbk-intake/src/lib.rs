//! nbk-intake
//!
//! Order intake engine.
//! - free-text shorthand parser (one directive per accepted line)
//! - cross-product / range and half-complement forms
//! - extracted orders from the AI collaborator, same path as manual entry
//! - balance guard consulted once per directive, before any mutation
//! - session grid + aggregator, then one ledger merge per directive
//!
//! Parsing and guarding are synchronous; only the ledger merge awaits.

mod error;
mod forms;
mod guard;
mod session;
mod store;

pub mod text;

pub use error::IntakeError;
pub use forms::{CrossForm, HarupForm};
pub use guard::{credit_guard, AllowAll, BalanceGuard, CreditLimit, FnGuard};
pub use session::{
    check_directives, prepare, submit, Applied, AppliedDirective, OrderSource, Session,
    SessionContext,
};
pub use store::LedgerStore;
pub use text::{auto_format_line, parse_text};
