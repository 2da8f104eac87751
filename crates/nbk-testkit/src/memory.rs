use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use nbk_db::{BookStore, SheetFilter};
use nbk_grid::{CellKey, Grid};
use nbk_intake::LedgerStore;
use nbk_schemas::{Client, DeclaredNumber, DrawCode, SettlementAdjustment, SheetKey, SheetLog};

#[derive(Default)]
struct Inner {
    sheets: BTreeMap<String, SheetLog>,
    clients: BTreeMap<String, Client>,
    declared: BTreeMap<(DrawCode, NaiveDate), CellKey>,
    settlements: Vec<SettlementAdjustment>,
    merges: usize,
    fail_merges_from: Option<usize>,
}

/// Mutex-guarded in-memory book. Merges to one sheet serialize on the lock.
#[derive(Default)]
pub struct MemoryBook {
    inner: Mutex<Inner>,
}

impl MemoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let book = Self::new();
        if let Ok(mut inner) = book.inner.lock() {
            for c in clients {
                inner.clients.insert(c.id.clone(), c);
            }
        }
        book
    }

    /// Every merge from the `n`-th (0-based) onward fails.
    pub fn fail_merges_from(&self, n: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_merges_from = Some(n);
        }
    }

    /// Successful merges so far.
    pub fn merge_count(&self) -> usize {
        self.inner.lock().map(|i| i.merges).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| anyhow!("memory book lock poisoned"))
    }
}

#[async_trait]
impl LedgerStore for MemoryBook {
    async fn merge(&self, key: &SheetKey, client_name: &str, delta: &Grid) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.fail_merges_from.is_some_and(|n| inner.merges >= n) {
            bail!("memory book: merge refused for {}", key.doc_id());
        }
        let sheet = inner
            .sheets
            .entry(key.doc_id())
            .or_insert_with(|| SheetLog::empty(key, client_name));
        sheet.grid.merge(delta)?;
        sheet.game_total = sheet.grid.total();
        sheet.client_name = client_name.to_string();
        sheet.updated_at = Some(Utc::now());
        inner.merges += 1;
        Ok(())
    }
}

#[async_trait]
impl BookStore for MemoryBook {
    async fn sheet(&self, key: &SheetKey) -> Result<Option<SheetLog>> {
        Ok(self.lock()?.sheets.get(&key.doc_id()).cloned())
    }

    async fn sheet_logs(&self, filter: &SheetFilter) -> Result<Vec<SheetLog>> {
        let mut out: Vec<SheetLog> = self
            .lock()?
            .sheets
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            (a.date, &a.client_id, &a.draw).cmp(&(b.date, &b.client_id, &b.draw))
        });
        Ok(out)
    }

    async fn clients(&self) -> Result<Vec<Client>> {
        Ok(self.lock()?.clients.values().cloned().collect())
    }

    async fn client_by_phone(&self, phone: &str) -> Result<Option<Client>> {
        Ok(self
            .lock()?
            .clients
            .values()
            .find(|c| c.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn upsert_client(&self, client: &Client) -> Result<()> {
        client.validate()?;
        self.lock()?.clients.insert(client.id.clone(), client.clone());
        Ok(())
    }

    async fn declared_numbers(&self) -> Result<Vec<DeclaredNumber>> {
        Ok(self
            .lock()?
            .declared
            .iter()
            .map(|((draw, date), cell)| DeclaredNumber {
                draw: draw.clone(),
                date: *date,
                cell: *cell,
            })
            .collect())
    }

    async fn declare_number(&self, d: &DeclaredNumber) -> Result<()> {
        self.lock()?.declared.insert((d.draw.clone(), d.date), d.cell);
        Ok(())
    }

    async fn settlements(&self) -> Result<Vec<SettlementAdjustment>> {
        let mut out = self.lock()?.settlements.clone();
        out.sort_by_key(|a| (a.date, a.created_at));
        Ok(out)
    }

    async fn record_settlement(&self, adjustment: &SettlementAdjustment) -> Result<()> {
        self.lock()?.settlements.push(adjustment.clone());
        Ok(())
    }

    async fn clear_client_data(&self, client_id: &str) -> Result<u64> {
        let mut inner = self.lock()?;
        let before = inner.sheets.len();
        inner.sheets.retain(|_, s| s.client_id != client_id);
        Ok((before - inner.sheets.len()) as u64)
    }
}
