//! Shared runtime state for nbk-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The store and the
//! extractor are trait objects so tests can swap in the in-memory book and a
//! canned extractor.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use nbk_config::BookConfig;
use nbk_db::BookStore;
use nbk_grid::{Amount, CellKey};
use nbk_intake::{credit_guard, BalanceGuard};
use nbk_schemas::DrawCode;
use nbk_settlement::{RunningBalance, UpperTerms};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::extractor::OrderExtractor;

// ---------------------------------------------------------------------------
// BusMsg
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    SheetUpdated {
        doc_id: String,
        client_id: String,
        draw: DrawCode,
        date: NaiveDate,
        total_delta: Amount,
    },
    NumberDeclared {
        draw: DrawCode,
        date: NaiveDate,
        cell: CellKey,
    },
    SettlementRecorded {
        id: Uuid,
        date: NaiveDate,
        amount: Amount,
    },
    LogLine {
        level: String,
        msg: String,
    },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub store: Arc<dyn BookStore>,
    pub extractor: Arc<dyn OrderExtractor>,
    pub config: BookConfig,
    /// Hash of the canonical config the daemon booted with, if loaded from
    /// YAML.
    pub config_hash: Option<String>,
    /// Memoized running balance. Every write handler invalidates it from the
    /// written date onward.
    pub running: Arc<Mutex<RunningBalance>>,
    today_override: Option<NaiveDate>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn BookStore>,
        extractor: Arc<dyn OrderExtractor>,
        config: BookConfig,
    ) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "nbk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            store,
            extractor,
            config,
            config_hash: None,
            running: Arc::new(Mutex::new(RunningBalance::new())),
            today_override: None,
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Pin the business day (tests, replays).
    pub fn with_today(mut self, date: NaiveDate) -> Self {
        self.today_override = Some(date);
        self
    }

    /// Business day bets are booked under.
    pub fn today(&self) -> NaiveDate {
        self.today_override.unwrap_or_else(|| self.config.today())
    }

    pub fn upper_terms(&self) -> UpperTerms {
        UpperTerms {
            commission_pct: self.config.upper.commission_pct,
            pair_rate: self.config.upper.pair_rate,
        }
    }

    /// Per-directive guard from `intake.credit_limit`.
    pub fn guard(&self) -> Box<dyn BalanceGuard + Send + Sync> {
        credit_guard(self.config.intake.credit_limit)
    }

    /// Drop memoized balances on or after `date`.
    pub async fn invalidate_from(&self, date: NaiveDate) {
        self.running.lock().await.invalidate_from(date);
    }

    pub fn publish(&self, msg: BusMsg) {
        // No subscribers is not an error.
        let _ = self.bus.send(msg);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
