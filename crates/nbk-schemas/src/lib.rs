//! Persisted and wire records shared by the store, the daemon and the CLI.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use nbk_grid::{Amount, CellKey, Grid, Rate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("invalid draw code '{0}': expected 1-8 ASCII letters or digits")]
    InvalidDrawCode(String),

    #[error("settlement must be exactly one of pay-out or receive")]
    AmbiguousSettlement,

    #[error("settlement amount must be positive, got {0}")]
    NonPositiveSettlement(Amount),

    #[error("commission percent {0} outside 0..=100")]
    InvalidCommission(Rate),
}

// ---------------------------------------------------------------------------
// Draw code
// ---------------------------------------------------------------------------

/// Short code naming a daily draw (`"GALI"`, `"DSWR"`). Always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DrawCode(String);

impl DrawCode {
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let t = s.trim();
        if t.is_empty() || t.len() > 8 || !t.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SchemaError::InvalidDrawCode(s.to_string()));
        }
        Ok(DrawCode(t.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrawCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DrawCode {
    type Err = SchemaError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrawCode::parse(s)
    }
}

impl TryFrom<String> for DrawCode {
    type Error = SchemaError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        DrawCode::parse(&s)
    }
}

impl From<DrawCode> for String {
    fn from(d: DrawCode) -> Self {
        d.0
    }
}

// ---------------------------------------------------------------------------
// Sheet log (one client, one draw, one day)
// ---------------------------------------------------------------------------

/// Composite identity of a sheet log.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SheetKey {
    pub client_id: String,
    pub draw: DrawCode,
    pub date: NaiveDate,
}

impl SheetKey {
    pub fn new(client_id: impl Into<String>, draw: DrawCode, date: NaiveDate) -> Self {
        Self {
            client_id: client_id.into(),
            draw,
            date,
        }
    }

    /// Deterministic document id: `clientId-draw-YYYY-MM-DD`.
    pub fn doc_id(&self) -> String {
        format!("{}-{}-{}", self.client_id, self.draw, self.date.format("%Y-%m-%d"))
    }
}

/// Persisted per-(client, draw, day) bet sheet.
///
/// `game_total` is stored alongside the grid and must equal `grid.total()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLog {
    pub client_id: String,
    pub client_name: String,
    pub draw: DrawCode,
    pub date: NaiveDate,
    pub game_total: Amount,
    pub grid: Grid,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SheetLog {
    /// Empty sheet for a key (what a first merge starts from).
    pub fn empty(key: &SheetKey, client_name: impl Into<String>) -> Self {
        Self {
            client_id: key.client_id.clone(),
            client_name: client_name.into(),
            draw: key.draw.clone(),
            date: key.date,
            game_total: Amount::ZERO,
            grid: Grid::new(),
            updated_at: None,
        }
    }

    pub fn key(&self) -> SheetKey {
        SheetKey::new(self.client_id.clone(), self.draw.clone(), self.date)
    }

    pub fn is_consistent(&self) -> bool {
        self.game_total == self.grid.total() && self.grid.verify_total()
    }

    pub fn stake_on(&self, cell: CellKey) -> Amount {
        self.grid.get(cell)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Credit,
}

/// Client terms as owned by account management. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    /// Payout multiplier on the stake placed on the declared cell.
    pub pair_rate: Rate,
    /// Percent of game total retained before computing payable.
    pub commission_pct: Rate,
    pub opening_balance: Amount,
    pub payment_type: PaymentType,
}

impl Client {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if !self.commission_pct.is_valid_percent() {
            return Err(SchemaError::InvalidCommission(self.commission_pct));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Declared numbers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredNumber {
    pub draw: DrawCode,
    pub date: NaiveDate,
    pub cell: CellKey,
}

/// Winning cell per (draw, date).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredMap(BTreeMap<(DrawCode, NaiveDate), CellKey>);

impl DeclaredMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the previous cell, if any.
    pub fn insert(&mut self, d: DeclaredNumber) -> Option<CellKey> {
        self.0.insert((d.draw, d.date), d.cell)
    }

    pub fn get(&self, draw: &DrawCode, date: NaiveDate) -> Option<CellKey> {
        self.0.get(&(draw.clone(), date)).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<DeclaredNumber> for DeclaredMap {
    fn from_iter<I: IntoIterator<Item = DeclaredNumber>>(iter: I) -> Self {
        let mut m = DeclaredMap::new();
        for d in iter {
            m.insert(d);
        }
        m
    }
}

// ---------------------------------------------------------------------------
// Settlement adjustments
// ---------------------------------------------------------------------------

/// One manual settlement action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum SettlementAction {
    PayOut(Amount),
    Receive(Amount),
}

impl SettlementAction {
    /// Exactly one of the two fields must be set, and positive.
    pub fn from_fields(
        pay_out: Option<Amount>,
        receive: Option<Amount>,
    ) -> Result<Self, SchemaError> {
        let action = match (pay_out, receive) {
            (Some(a), None) => SettlementAction::PayOut(a),
            (None, Some(a)) => SettlementAction::Receive(a),
            _ => return Err(SchemaError::AmbiguousSettlement),
        };
        let amount = action.magnitude();
        if !amount.is_positive() {
            return Err(SchemaError::NonPositiveSettlement(amount));
        }
        Ok(action)
    }

    pub fn magnitude(self) -> Amount {
        match self {
            SettlementAction::PayOut(a) | SettlementAction::Receive(a) => a,
        }
    }

    /// Pay-outs reduce the broker balance; receipts increase it.
    pub fn signed(self) -> Amount {
        match self {
            SettlementAction::PayOut(a) => -a,
            SettlementAction::Receive(a) => a,
        }
    }
}

/// A manual correction to the broker's running balance on `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementAdjustment {
    pub id: Uuid,
    pub date: NaiveDate,
    /// Signed: negative for pay-outs, positive for receipts.
    pub amount: Amount,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl SettlementAdjustment {
    pub fn record(date: NaiveDate, action: SettlementAction, note: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            amount: action.signed(),
            note: note.into(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Order extraction payloads
// ---------------------------------------------------------------------------

/// One order as returned by the extraction collaborator. The cell is kept
/// raw; intake validates it like any typed key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedOrder {
    #[serde(alias = "cellKey", alias = "cell_key")]
    pub cell: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedOrders {
    pub draw: DrawCode,
    pub orders: Vec<ExtractedOrder>,
}
