use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use nbk_intake::LedgerStore;
use nbk_schemas::{Client, DeclaredNumber, DrawCode, SettlementAdjustment, SheetKey, SheetLog};

/// Which sheets to read. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetFilter {
    pub client_id: Option<String>,
    pub draw: Option<DrawCode>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl SheetFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn client(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn matches(&self, log: &SheetLog) -> bool {
        self.client_id.as_deref().map_or(true, |c| c == log.client_id)
            && self.draw.as_ref().map_or(true, |d| *d == log.draw)
            && self.from.map_or(true, |f| log.date >= f)
            && self.to.map_or(true, |t| log.date <= t)
    }
}

/// Everything the daemon and CLI read or write besides the ledger merge.
///
/// Sheets come back ordered by `(date, client_id, draw)`.
#[async_trait]
pub trait BookStore: LedgerStore {
    async fn sheet(&self, key: &SheetKey) -> Result<Option<SheetLog>>;
    async fn sheet_logs(&self, filter: &SheetFilter) -> Result<Vec<SheetLog>>;

    async fn clients(&self) -> Result<Vec<Client>>;
    async fn client_by_phone(&self, phone: &str) -> Result<Option<Client>>;
    async fn upsert_client(&self, client: &Client) -> Result<()>;

    async fn declared_numbers(&self) -> Result<Vec<DeclaredNumber>>;
    /// Insert or replace the winning cell for `(draw, date)`.
    async fn declare_number(&self, declared: &DeclaredNumber) -> Result<()>;

    async fn settlements(&self) -> Result<Vec<SettlementAdjustment>>;
    async fn record_settlement(&self, adjustment: &SettlementAdjustment) -> Result<()>;

    /// Delete every sheet of one client; returns how many were removed.
    async fn clear_client_data(&self, client_id: &str) -> Result<u64>;
}
