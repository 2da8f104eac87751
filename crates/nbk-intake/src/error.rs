use nbk_expand::ExpandError;
use nbk_grid::{Amount, GridError};
use thiserror::Error;

/// Everything that can stop a submission.
///
/// All variants except `Persistence` are raised before the session grid is
/// touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    /// Compact `digits=count=amount` count matched neither acceptable value.
    #[error(
        "line {line}: count {declared} does not fit digits '{digits}'; \
         use {with_self_pairs} (with self-pairs) or {without_self_pairs} (without)"
    )]
    StructuralValidation {
        line: usize,
        digits: String,
        declared: usize,
        with_self_pairs: usize,
        without_self_pairs: usize,
    },

    /// The host's balance guard refused a directive.
    #[error("balance exceeded: attempted {attempted} for '{description}'")]
    BalanceExceeded { attempted: Amount, description: String },

    /// Nothing in the submission parsed into a directive.
    #[error("no valid data")]
    NoValidData,

    /// A structured form or extracted order set was malformed.
    #[error("invalid entry: {0}")]
    InvalidForm(String),

    #[error(transparent)]
    Expand(#[from] ExpandError),

    #[error(transparent)]
    Grid(#[from] GridError),

    /// Local grid was updated but the ledger merge for `directive` failed.
    #[error("ledger merge failed for directive {directive}: {message}")]
    Persistence { directive: usize, message: String },
}

impl IntakeError {
    /// Stable code for API bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            IntakeError::StructuralValidation { .. } => "INTAKE_STRUCTURAL_VALIDATION",
            IntakeError::BalanceExceeded { .. } => "INTAKE_BALANCE_EXCEEDED",
            IntakeError::NoValidData => "INTAKE_NO_VALID_DATA",
            IntakeError::InvalidForm(_) | IntakeError::Expand(_) | IntakeError::Grid(_) => {
                "INTAKE_INVALID_ENTRY"
            }
            IntakeError::Persistence { .. } => "INTAKE_PERSISTENCE",
        }
    }

    /// `true` when the session grid is guaranteed untouched.
    pub fn is_pre_mutation(&self) -> bool {
        !matches!(self, IntakeError::Persistence { .. })
    }
}
