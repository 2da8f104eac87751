//! A sheet write that lands while `/v1/reports/balance` is loading its
//! snapshot must not leave a stale value in the memo.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use nbk_config::BookConfig;
use nbk_daemon::{extractor::DisabledExtractor, routes, state::AppState};
use nbk_db::{BookStore, SheetFilter};
use nbk_grid::{Amount, Grid};
use nbk_intake::LedgerStore;
use nbk_schemas::{Client, DeclaredNumber, DrawCode, SettlementAdjustment, SheetKey, SheetLog};
use nbk_settlement::RunningBalance;
use nbk_testkit::{client, date, grid, MemoryBook};
use tokio::sync::Mutex;
use tower::ServiceExt; // oneshot

/// Delegates to a [`MemoryBook`]. When armed, the next `sheet_logs` read
/// returns the current sheets and then commits one more sheet and
/// invalidates the daemon's memo, as a concurrent entry would.
struct WriteDuringLoad {
    inner: MemoryBook,
    armed: AtomicBool,
    running: OnceLock<Arc<Mutex<RunningBalance>>>,
    key: SheetKey,
    delta: Grid,
}

#[async_trait]
impl LedgerStore for WriteDuringLoad {
    async fn merge(&self, key: &SheetKey, client_name: &str, delta: &Grid) -> Result<()> {
        self.inner.merge(key, client_name, delta).await
    }
}

#[async_trait]
impl BookStore for WriteDuringLoad {
    async fn sheet(&self, key: &SheetKey) -> Result<Option<SheetLog>> {
        self.inner.sheet(key).await
    }

    async fn sheet_logs(&self, filter: &SheetFilter) -> Result<Vec<SheetLog>> {
        let logs = self.inner.sheet_logs(filter).await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.inner.merge(&self.key, "C1", &self.delta).await?;
            if let Some(running) = self.running.get() {
                running.lock().await.invalidate_from(self.key.date);
            }
        }
        Ok(logs)
    }

    async fn clients(&self) -> Result<Vec<Client>> {
        self.inner.clients().await
    }

    async fn client_by_phone(&self, phone: &str) -> Result<Option<Client>> {
        self.inner.client_by_phone(phone).await
    }

    async fn upsert_client(&self, client: &Client) -> Result<()> {
        self.inner.upsert_client(client).await
    }

    async fn declared_numbers(&self) -> Result<Vec<DeclaredNumber>> {
        self.inner.declared_numbers().await
    }

    async fn declare_number(&self, declared: &DeclaredNumber) -> Result<()> {
        self.inner.declare_number(declared).await
    }

    async fn settlements(&self) -> Result<Vec<SettlementAdjustment>> {
        self.inner.settlements().await
    }

    async fn record_settlement(&self, adjustment: &SettlementAdjustment) -> Result<()> {
        self.inner.record_settlement(adjustment).await
    }

    async fn clear_client_data(&self, client_id: &str) -> Result<u64> {
        self.inner.clear_client_data(client_id).await
    }
}

fn gali(day: &str) -> SheetKey {
    SheetKey::new("c1", DrawCode::parse("GALI").unwrap(), date(day))
}

async fn balance(router: axum::Router, uri: &str) -> Amount {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.expect("oneshot failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    serde_json::from_value(v["balance"].clone()).unwrap()
}

#[tokio::test]
async fn write_during_snapshot_load_does_not_poison_the_memo() {
    let store = Arc::new(WriteDuringLoad {
        inner: MemoryBook::with_clients([client("c1", None)]),
        armed: AtomicBool::new(false),
        running: OnceLock::new(),
        key: gali("2024-03-02"),
        delta: grid(&[("12", 150)]),
    });
    store
        .merge(&gali("2024-03-01"), "C1", &grid(&[("12", 100)]))
        .await
        .unwrap();

    let st = AppState::new(store.clone(), Arc::new(DisabledExtractor), BookConfig::default())
        .with_today(date("2024-03-01"));
    let _ = store.running.set(Arc::clone(&st.running));
    let router = routes::build_router(Arc::new(st));
    let uri = "/v1/reports/balance?through=2024-03-05";

    // 100 at 5% commission, no declared number.
    let before = balance(router.clone(), uri).await;
    assert_eq!(before, Amount::from_units(95) - Amount::from_units(80));

    store.armed.store(true, Ordering::SeqCst);
    let in_flight = balance(router.clone(), uri).await;
    assert_eq!(in_flight, before);

    // The day-2 sheet committed during the previous load: 250 total.
    let after = balance(router, uri).await;
    assert_eq!(after, Amount::parse("237.5").unwrap() - Amount::from_units(200));
}
