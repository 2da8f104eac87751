//! Request and response types for all nbk-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use chrono::NaiveDate;
use nbk_grid::{Amount, CellKey, GridTotals, Rate};
use nbk_schemas::{DrawCode, PaymentType};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health  /v1/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub daemon_uptime_secs: u64,
    pub today: NaiveDate,
    pub timezone: String,
    pub draws: Vec<DrawCode>,
    pub config_hash: Option<String>,
    /// Which extractor is wired: "http" | "disabled" | test names.
    pub extractor: &'static str,
    pub credit_limit: Option<Amount>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine code, e.g. `INTAKE_BALANCE_EXCEEDED`.
    pub code: String,
}

// ---------------------------------------------------------------------------
// /v1/bets  /v1/entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRequest {
    pub message: String,
    pub client_phone_number: String,
}

/// Manual entry for a known client. `date` defaults to today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRequest {
    pub client_id: String,
    pub draw: DrawCode,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub entry: EntryForm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryForm {
    Text {
        text: String,
    },
    Cross {
        leading: String,
        trailing: String,
        #[serde(default)]
        remove_self_pairs: bool,
        #[serde(default)]
        reverse: bool,
        amount: Amount,
    },
    Range {
        start: u8,
        end: u8,
        amount: Amount,
    },
    Harup {
        #[serde(default)]
        leading: String,
        #[serde(default)]
        trailing: String,
        amount: Amount,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveSummary {
    pub description: String,
    pub total: Amount,
    pub cells: usize,
}

/// Outcome of an accepted submission, with the sheet as it stands after the
/// merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub doc_id: String,
    pub client_id: String,
    pub draw: DrawCode,
    pub date: NaiveDate,
    pub directives: Vec<DirectiveSummary>,
    pub total_delta: Amount,
    pub game_total: Amount,
    pub totals: GridTotals,
}

// ---------------------------------------------------------------------------
// /v1/format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatResponse {
    pub text: String,
}

// ---------------------------------------------------------------------------
// /v1/clients
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub pair_rate: Rate,
    pub commission_pct: Rate,
    #[serde(default)]
    pub opening_balance: Amount,
    pub payment_type: PaymentType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearSheetsResponse {
    pub client_id: String,
    pub removed: u64,
}

// ---------------------------------------------------------------------------
// /v1/settlements  /v1/declared
// ---------------------------------------------------------------------------

/// Exactly one of `pay_out` / `receive` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub pay_out: Option<Amount>,
    #[serde(default)]
    pub receive: Option<Amount>,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclareRequest {
    pub draw: DrawCode,
    pub date: NaiveDate,
    pub cell: CellKey,
}

// ---------------------------------------------------------------------------
// /v1/reports
// ---------------------------------------------------------------------------

// Scope fields are repeated rather than flattened: urlencoded numbers do not
// survive `#[serde(flatten)]`.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub client_id: Option<String>,
    pub draw: Option<DrawCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyQuery {
    pub year: i32,
    pub client_id: Option<String>,
    pub draw: Option<DrawCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughQuery {
    /// Defaults to today.
    pub through: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub date: NaiveDate,
    pub balance: Amount,
}
