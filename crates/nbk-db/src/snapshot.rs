use std::collections::BTreeMap;

use anyhow::{Context, Result};
use nbk_schemas::DeclaredMap;
use nbk_settlement::{SettlementBook, UpperTerms};
use tracing::debug;

use crate::{BookStore, SheetFilter};

/// Load a read-only settlement snapshot from the store.
pub async fn load_settlement_book<S>(store: &S, filter: &SheetFilter, upper: UpperTerms) -> Result<SettlementBook>
where
    S: BookStore + ?Sized,
{
    let logs = store.sheet_logs(filter).await.context("load sheets")?;
    let declared: DeclaredMap = store
        .declared_numbers()
        .await
        .context("load declared numbers")?
        .into_iter()
        .collect();
    let clients: BTreeMap<String, _> = store
        .clients()
        .await
        .context("load clients")?
        .into_iter()
        .map(|c| (c.id.clone(), c))
        .collect();
    let adjustments = store.settlements().await.context("load settlements")?;

    debug!(
        sheets = logs.len(),
        declared = declared.len(),
        clients = clients.len(),
        adjustments = adjustments.len(),
        "settlement snapshot loaded"
    );
    Ok(SettlementBook {
        logs,
        declared,
        clients,
        adjustments,
        upper,
    })
}
