use async_trait::async_trait;
use nbk_grid::Grid;
use nbk_schemas::SheetKey;

/// Ledger upsert contract.
///
/// `merge` adds `delta` key-wise into the sheet stored under `key`, creating
/// it if absent: resulting game total = previous total (or zero) + delta
/// total. Implementations resolve concurrent writers; intake performs no
/// retries.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn merge(&self, key: &SheetKey, client_name: &str, delta: &Grid) -> anyhow::Result<()>;
}
