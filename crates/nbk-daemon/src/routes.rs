//! Axum router and all HTTP handlers for nbk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are `pub(crate)` so the scenario tests in
//! `tests/` compose the router directly.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use futures_util::{Stream, StreamExt};
use nbk_db::{load_settlement_book, SheetFilter};
use nbk_expand::{digits_of, CrossOptions, KeySpec};
use nbk_grid::Grid;
use nbk_intake::{
    auto_format_line, submit, CrossForm, HarupForm, OrderSource, Session, SessionContext,
};
use nbk_schemas::{
    Client, DeclaredNumber, DrawCode, SettlementAction, SettlementAdjustment,
};
use nbk_settlement::{
    CumulativeRow, PeriodReportRow, Scope, SettlementBook, StatementRow,
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::{
    api_types::{
        BalanceResponse, BetRequest, ClearSheetsResponse, ClientRequest, DailyQuery,
        DeclareRequest, DirectiveSummary, EntryForm, EntryRequest, FormatRequest,
        FormatResponse, HealthResponse, MonthlyQuery, SettlementRequest, StatementQuery,
        StatusResponse, SubmissionResponse, ThroughQuery,
    },
    error::ApiError,
    state::{uptime_secs, AppState, BusMsg},
};

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/bets", post(submit_bet))
        .route("/v1/entries", post(submit_entry))
        .route("/v1/format", post(format_text))
        .route("/v1/clients", get(list_clients).post(upsert_client))
        .route("/v1/clients/:id/sheets", delete(clear_client_sheets))
        .route("/v1/clients/:id/statement", get(client_statement))
        .route("/v1/declared", get(list_declared).post(declare_number))
        .route("/v1/settlements", get(list_settlements).post(record_settlement))
        .route("/v1/reports/daily", get(daily_report))
        .route("/v1/reports/monthly", get(monthly_report))
        .route("/v1/reports/cumulative", get(cumulative_report))
        .route("/v1/reports/balance", get(running_balance))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health  /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatusResponse {
            daemon_uptime_secs: uptime_secs(),
            today: st.today(),
            timezone: st.config.timezone.clone(),
            draws: st.config.draws.clone(),
            config_hash: st.config_hash.clone(),
            extractor: st.extractor.source_name(),
            credit_limit: st.config.intake.credit_limit,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/bets
// ---------------------------------------------------------------------------

/// Free-form message from a client's phone: resolve the client, extract
/// orders, and merge them into today's sheet for the extracted draw.
pub(crate) async fn submit_bet(
    State(st): State<Arc<AppState>>,
    Json(req): Json<BetRequest>,
) -> ApiResult<SubmissionResponse> {
    let phone = req.client_phone_number.trim();
    if req.message.trim().is_empty() || phone.is_empty() {
        return Err(ApiError::unprocessable(
            "BET_MISSING_FIELDS",
            "message and client_phone_number are required",
        ));
    }

    let client = st
        .store
        .client_by_phone(phone)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| {
            ApiError::not_found("CLIENT_NOT_FOUND", format!("no client with phone '{phone}'"))
        })?;

    let extracted = st
        .extractor
        .extract(&req.message, &client.id)
        .await
        .map_err(ApiError::extractor)?;
    ensure_known_draw(&st, &extracted.draw)?;

    let ctx = SessionContext {
        client_id: client.id.clone(),
        client_name: client.name.clone(),
        draw: extracted.draw.clone(),
        date: st.today(),
    };
    run_submission(&st, ctx, OrderSource::Extracted(extracted))
        .await
        .map(Json)
}

// ---------------------------------------------------------------------------
// POST /v1/entries
// ---------------------------------------------------------------------------

/// Operator entry for a known client: shorthand text or a structured form.
pub(crate) async fn submit_entry(
    State(st): State<Arc<AppState>>,
    Json(req): Json<EntryRequest>,
) -> ApiResult<SubmissionResponse> {
    ensure_known_draw(&st, &req.draw)?;
    let client = find_client(&st, &req.client_id).await?;

    let source = match req.entry {
        EntryForm::Text { text } => OrderSource::Text(text),
        EntryForm::Cross {
            leading,
            trailing,
            remove_self_pairs,
            reverse,
            amount,
        } => OrderSource::Cross(CrossForm {
            spec: KeySpec::Cross {
                leading: digits_of(&leading),
                trailing: digits_of(&trailing),
                options: CrossOptions {
                    remove_self_pairs,
                    reverse,
                },
            },
            amount,
        }),
        EntryForm::Range { start, end, amount } => OrderSource::Cross(CrossForm {
            spec: KeySpec::Range { start, end },
            amount,
        }),
        EntryForm::Harup {
            leading,
            trailing,
            amount,
        } => OrderSource::Harup(HarupForm {
            leading,
            trailing,
            amount,
        }),
    };

    let ctx = SessionContext {
        client_id: client.id,
        client_name: client.name,
        draw: req.draw,
        date: req.date.unwrap_or_else(|| st.today()),
    };
    run_submission(&st, ctx, source).await.map(Json)
}

async fn run_submission(
    st: &AppState,
    ctx: SessionContext,
    source: OrderSource,
) -> Result<SubmissionResponse, ApiError> {
    let key = ctx.key();
    let existing = st
        .store
        .sheet(&key)
        .await
        .map_err(ApiError::store)?
        .map(|log| log.grid)
        .unwrap_or_else(Grid::new);

    let mut session = Session::with_grid(ctx, existing);
    let guard = st.guard();
    let result = submit(&mut session, source, guard.as_ref(), st.store.as_ref()).await;

    let applied = match result {
        Ok(applied) => applied,
        Err(e) => {
            // A failed merge may still have landed earlier directives.
            if !e.is_pre_mutation() {
                st.invalidate_from(key.date).await;
            }
            return Err(e.into());
        }
    };
    st.invalidate_from(key.date).await;

    let doc_id = key.doc_id();
    info!(
        doc_id = %doc_id,
        total_delta = %applied.total_delta,
        directives = applied.directives.len(),
        "sheet updated"
    );
    st.publish(BusMsg::SheetUpdated {
        doc_id: doc_id.clone(),
        client_id: key.client_id.clone(),
        draw: key.draw.clone(),
        date: key.date,
        total_delta: applied.total_delta,
    });

    Ok(SubmissionResponse {
        doc_id,
        client_id: key.client_id,
        draw: key.draw,
        date: key.date,
        directives: applied
            .directives
            .into_iter()
            .map(|d| DirectiveSummary {
                description: d.description,
                total: d.total,
                cells: d.cells,
            })
            .collect(),
        total_delta: applied.total_delta,
        game_total: session.grid().total(),
        totals: session.totals().clone(),
    })
}

fn ensure_known_draw(st: &AppState, draw: &DrawCode) -> Result<(), ApiError> {
    if st.config.is_known_draw(draw) {
        Ok(())
    } else {
        Err(ApiError::unprocessable(
            "UNKNOWN_DRAW",
            format!("draw {draw} is not configured"),
        ))
    }
}

async fn find_client(st: &AppState, client_id: &str) -> Result<Client, ApiError> {
    st.store
        .clients()
        .await
        .map_err(ApiError::store)?
        .into_iter()
        .find(|c| c.id == client_id)
        .ok_or_else(|| ApiError::not_found("CLIENT_NOT_FOUND", format!("unknown client '{client_id}'")))
}

// ---------------------------------------------------------------------------
// POST /v1/format
// ---------------------------------------------------------------------------

pub(crate) async fn format_text(Json(req): Json<FormatRequest>) -> Json<FormatResponse> {
    let text = req
        .text
        .lines()
        .map(auto_format_line)
        .collect::<Vec<_>>()
        .join("\n");
    Json(FormatResponse { text })
}

// ---------------------------------------------------------------------------
// /v1/clients
// ---------------------------------------------------------------------------

pub(crate) async fn list_clients(State(st): State<Arc<AppState>>) -> ApiResult<Vec<Client>> {
    st.store.clients().await.map(Json).map_err(ApiError::store)
}

pub(crate) async fn upsert_client(
    State(st): State<Arc<AppState>>,
    Json(req): Json<ClientRequest>,
) -> ApiResult<Client> {
    let client = Client {
        id: req.id.trim().to_string(),
        name: req.name.trim().to_string(),
        phone: req.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        pair_rate: req.pair_rate,
        commission_pct: req.commission_pct,
        opening_balance: req.opening_balance,
        payment_type: req.payment_type,
    };
    client.validate()?;
    st.store.upsert_client(&client).await.map_err(ApiError::store)?;
    // Terms and opening balance feed every day's total.
    st.invalidate_from(NaiveDate::MIN).await;
    info!(client_id = %client.id, "client upserted");
    Ok(Json(client))
}

pub(crate) async fn clear_client_sheets(
    State(st): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> ApiResult<ClearSheetsResponse> {
    let removed = st
        .store
        .clear_client_data(&client_id)
        .await
        .map_err(ApiError::store)?;
    st.invalidate_from(NaiveDate::MIN).await;
    info!(client_id = %client_id, removed, "client sheets cleared");
    st.publish(BusMsg::LogLine {
        level: "WARN".to_string(),
        msg: format!("cleared {removed} sheets for client {client_id}"),
    });
    Ok(Json(ClearSheetsResponse { client_id, removed }))
}

pub(crate) async fn client_statement(
    State(st): State<Arc<AppState>>,
    Path(client_id): Path<String>,
    Query(q): Query<StatementQuery>,
) -> ApiResult<Vec<StatementRow>> {
    let book = snapshot(&st, &SheetFilter::client(client_id.clone())).await?;
    Ok(Json(book.client_statement(&client_id, q.from, q.to)?))
}

// ---------------------------------------------------------------------------
// /v1/declared
// ---------------------------------------------------------------------------

pub(crate) async fn list_declared(
    State(st): State<Arc<AppState>>,
) -> ApiResult<Vec<DeclaredNumber>> {
    st.store
        .declared_numbers()
        .await
        .map(Json)
        .map_err(ApiError::store)
}

pub(crate) async fn declare_number(
    State(st): State<Arc<AppState>>,
    Json(req): Json<DeclareRequest>,
) -> ApiResult<DeclaredNumber> {
    ensure_known_draw(&st, &req.draw)?;
    let declared = DeclaredNumber {
        draw: req.draw,
        date: req.date,
        cell: req.cell,
    };
    st.store
        .declare_number(&declared)
        .await
        .map_err(ApiError::store)?;
    st.invalidate_from(declared.date).await;
    info!(draw = %declared.draw, date = %declared.date, cell = %declared.cell, "number declared");
    st.publish(BusMsg::NumberDeclared {
        draw: declared.draw.clone(),
        date: declared.date,
        cell: declared.cell,
    });
    Ok(Json(declared))
}

// ---------------------------------------------------------------------------
// /v1/settlements
// ---------------------------------------------------------------------------

pub(crate) async fn list_settlements(
    State(st): State<Arc<AppState>>,
) -> ApiResult<Vec<SettlementAdjustment>> {
    st.store.settlements().await.map(Json).map_err(ApiError::store)
}

pub(crate) async fn record_settlement(
    State(st): State<Arc<AppState>>,
    Json(req): Json<SettlementRequest>,
) -> ApiResult<SettlementAdjustment> {
    let action = SettlementAction::from_fields(req.pay_out, req.receive)?;
    let adjustment = SettlementAdjustment::record(req.date, action, req.note.trim());
    st.store
        .record_settlement(&adjustment)
        .await
        .map_err(ApiError::store)?;
    st.invalidate_from(adjustment.date).await;
    info!(id = %adjustment.id, date = %adjustment.date, amount = %adjustment.amount, "settlement recorded");
    st.publish(BusMsg::SettlementRecorded {
        id: adjustment.id,
        date: adjustment.date,
        amount: adjustment.amount,
    });
    Ok(Json(adjustment))
}

// ---------------------------------------------------------------------------
// /v1/reports
// ---------------------------------------------------------------------------

async fn snapshot(st: &AppState, filter: &SheetFilter) -> Result<SettlementBook, ApiError> {
    load_settlement_book(st.store.as_ref(), filter, st.upper_terms())
        .await
        .map_err(ApiError::store)
}

fn scope_of(client_id: Option<String>, draw: Option<DrawCode>) -> Scope {
    Scope { client_id, draw }
}

pub(crate) async fn daily_report(
    State(st): State<Arc<AppState>>,
    Query(q): Query<DailyQuery>,
) -> ApiResult<Vec<PeriodReportRow>> {
    let filter = SheetFilter {
        client_id: q.client_id.clone(),
        draw: q.draw.clone(),
        from: Some(q.from),
        to: Some(q.to),
    };
    let book = snapshot(&st, &filter).await?;
    let scope = scope_of(q.client_id, q.draw);
    Ok(Json(book.daily_report(q.from, q.to, &scope)?))
}

pub(crate) async fn monthly_report(
    State(st): State<Arc<AppState>>,
    Query(q): Query<MonthlyQuery>,
) -> ApiResult<Vec<PeriodReportRow>> {
    let filter = SheetFilter {
        client_id: q.client_id.clone(),
        draw: q.draw.clone(),
        from: NaiveDate::from_ymd_opt(q.year, 1, 1),
        to: NaiveDate::from_ymd_opt(q.year, 12, 31),
    };
    let book = snapshot(&st, &filter).await?;
    let scope = scope_of(q.client_id, q.draw);
    Ok(Json(book.monthly_report(q.year, &scope)?))
}

pub(crate) async fn cumulative_report(
    State(st): State<Arc<AppState>>,
    Query(q): Query<ThroughQuery>,
) -> ApiResult<Vec<CumulativeRow>> {
    let through = q.through.unwrap_or_else(|| st.today());
    let filter = SheetFilter {
        to: Some(through),
        ..SheetFilter::all()
    };
    let book = snapshot(&st, &filter).await?;
    Ok(Json(book.cumulative_net(through)?))
}

/// Running balance through `through`, served from the memo where possible.
pub(crate) async fn running_balance(
    State(st): State<Arc<AppState>>,
    Query(q): Query<ThroughQuery>,
) -> ApiResult<BalanceResponse> {
    let date = q.through.unwrap_or_else(|| st.today());
    // Read before the snapshot so a write that lands during the load keeps
    // this answer out of the memo.
    let generation = st.running.lock().await.generation();
    let book = snapshot(&st, &SheetFilter::all()).await?;
    let balance = st
        .running
        .lock()
        .await
        .balance_at_snapshot(&book, date, generation)?;
    Ok(Json(BalanceResponse { date, balance }))
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::SheetUpdated { .. } => "sheet",
                    BusMsg::NumberDeclared { .. } => "declared",
                    BusMsg::SettlementRecorded { .. } => "settlement",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
