//! `nbk report ...`: settlement figures over a snapshot of the store.

use anyhow::Result;
use chrono::NaiveDate;
use nbk_config::BookConfig;
use nbk_db::{load_settlement_book, PgBook, SheetFilter};
use nbk_schemas::DrawCode;
use nbk_settlement::{PeriodReportRow, RunningBalance, Scope, SettlementBook};

use super::upper_terms;

async fn snapshot(cfg: &BookConfig, filter: &SheetFilter) -> Result<SettlementBook> {
    let pool = nbk_db::connect_from_env().await?;
    let store = PgBook::new(pool);
    load_settlement_book(&store, filter, upper_terms(cfg)).await
}

fn scope(client_id: Option<String>, draw: Option<&str>) -> Result<Scope> {
    let draw = draw.map(DrawCode::parse).transpose()?;
    Ok(Scope { client_id, draw })
}

fn print_period_rows(rows: &[PeriodReportRow]) {
    for r in rows {
        println!(
            "period={} client_payable={} upper_payable={} broker_net={} settlements={}",
            r.label, r.client_payable, r.upper_payable, r.broker_net, r.settlements
        );
    }
    println!("rows={}", rows.len());
}

pub async fn daily(
    cfg: &BookConfig,
    from: NaiveDate,
    to: NaiveDate,
    client_id: Option<String>,
    draw: Option<String>,
) -> Result<()> {
    let scope = scope(client_id, draw.as_deref())?;
    let filter = SheetFilter {
        client_id: scope.client_id.clone(),
        draw: scope.draw.clone(),
        from: Some(from),
        to: Some(to),
    };
    let book = snapshot(cfg, &filter).await?;
    print_period_rows(&book.daily_report(from, to, &scope)?);
    Ok(())
}

pub async fn monthly(
    cfg: &BookConfig,
    year: i32,
    client_id: Option<String>,
    draw: Option<String>,
) -> Result<()> {
    let scope = scope(client_id, draw.as_deref())?;
    let filter = SheetFilter {
        client_id: scope.client_id.clone(),
        draw: scope.draw.clone(),
        from: NaiveDate::from_ymd_opt(year, 1, 1),
        to: NaiveDate::from_ymd_opt(year, 12, 31),
    };
    let book = snapshot(cfg, &filter).await?;
    print_period_rows(&book.monthly_report(year, &scope)?);
    Ok(())
}

pub async fn cumulative(cfg: &BookConfig, through: NaiveDate) -> Result<()> {
    let filter = SheetFilter {
        to: Some(through),
        ..SheetFilter::all()
    };
    let book = snapshot(cfg, &filter).await?;
    let rows = book.cumulative_net(through)?;
    for r in &rows {
        println!(
            "date={} broker_net={} settlements={} day_total={} running={}",
            r.date, r.broker_net, r.settlements, r.day_total, r.running
        );
    }

    let balance = RunningBalance::new().balance_at(&book, through)?;
    println!("balance={balance} through={through}");
    Ok(())
}

pub async fn statement(cfg: &BookConfig, client_id: &str, from: NaiveDate, to: NaiveDate) -> Result<()> {
    let book = snapshot(cfg, &SheetFilter::client(client_id)).await?;
    let rows = book.client_statement(client_id, from, to)?;
    for r in &rows {
        println!(
            "date={} game_total={} passing={} payable={} balance={}",
            r.date, r.game_total, r.passing, r.payable, r.balance
        );
    }
    println!("rows={}", rows.len());
    Ok(())
}
