use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use nbk_grid::{Amount, CellKey, Grid, Rate};
use nbk_intake::LedgerStore;
use nbk_schemas::{
    Client, DeclaredNumber, DrawCode, PaymentType, SettlementAdjustment, SheetKey, SheetLog,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::{BookStore, SheetFilter};

/// Postgres-backed book.
#[derive(Clone)]
pub struct PgBook {
    pool: PgPool,
}

impl PgBook {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn payment_type_str(p: PaymentType) -> &'static str {
    match p {
        PaymentType::Cash => "cash",
        PaymentType::Credit => "credit",
    }
}

fn parse_payment_type(s: &str) -> Result<PaymentType> {
    match s {
        "cash" => Ok(PaymentType::Cash),
        "credit" => Ok(PaymentType::Credit),
        other => Err(anyhow!("unknown payment_type '{other}'")),
    }
}

fn sheet_from_row(row: &PgRow) -> Result<SheetLog> {
    let draw: String = row.try_get("draw")?;
    let Json(grid): Json<Grid> = row.try_get("grid")?;
    Ok(SheetLog {
        client_id: row.try_get("client_id")?,
        client_name: row.try_get("client_name")?,
        draw: DrawCode::parse(&draw)?,
        date: row.try_get("sheet_date")?,
        game_total: Amount::new(row.try_get("game_total_micros")?),
        grid,
        updated_at: Some(row.try_get("updated_at")?),
    })
}

fn client_from_row(row: &PgRow) -> Result<Client> {
    let payment_type: String = row.try_get("payment_type")?;
    Ok(Client {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        pair_rate: Rate::new(row.try_get("pair_rate_micros")?),
        commission_pct: Rate::new(row.try_get("commission_pct_micros")?),
        opening_balance: Amount::new(row.try_get("opening_balance_micros")?),
        payment_type: parse_payment_type(&payment_type)?,
    })
}

const SHEET_COLUMNS: &str =
    "client_id, client_name, draw, sheet_date, game_total_micros, grid, updated_at";

const CLIENT_COLUMNS: &str = "id, name, phone, pair_rate_micros, commission_pct_micros, \
                              opening_balance_micros, payment_type";

// ---------------------------------------------------------------------------
// Ledger merge
// ---------------------------------------------------------------------------

#[async_trait]
impl LedgerStore for PgBook {
    /// Insert-if-absent, then lock the row and add the delta key-wise inside
    /// one transaction, so concurrent merges to one sheet serialize.
    async fn merge(&self, key: &SheetKey, client_name: &str, delta: &Grid) -> Result<()> {
        let doc_id = key.doc_id();
        let mut tx = self.pool.begin().await.context("merge: begin")?;

        sqlx::query(
            r#"
            insert into sheet_logs (doc_id, client_id, client_name, draw, sheet_date)
            values ($1, $2, $3, $4, $5)
            on conflict (doc_id) do nothing
            "#,
        )
        .bind(&doc_id)
        .bind(&key.client_id)
        .bind(client_name)
        .bind(key.draw.as_str())
        .bind(key.date)
        .execute(&mut *tx)
        .await
        .context("merge: ensure sheet")?;

        let row = sqlx::query("select grid from sheet_logs where doc_id = $1 for update")
            .bind(&doc_id)
            .fetch_one(&mut *tx)
            .await
            .context("merge: lock sheet")?;
        let Json(mut grid): Json<Grid> = row.try_get("grid")?;

        grid.merge(delta)
            .with_context(|| format!("merge: apply delta to {doc_id}"))?;

        sqlx::query(
            r#"
            update sheet_logs
               set grid = $2, game_total_micros = $3, client_name = $4, updated_at = now()
             where doc_id = $1
            "#,
        )
        .bind(&doc_id)
        .bind(Json(&grid))
        .bind(grid.total().raw())
        .bind(client_name)
        .execute(&mut *tx)
        .await
        .context("merge: write sheet")?;

        tx.commit().await.context("merge: commit")?;
        debug!(doc_id = %doc_id, delta = %delta.total(), total = %grid.total(), "sheet merged");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reads and admin writes
// ---------------------------------------------------------------------------

#[async_trait]
impl BookStore for PgBook {
    async fn sheet(&self, key: &SheetKey) -> Result<Option<SheetLog>> {
        let sql = format!("select {SHEET_COLUMNS} from sheet_logs where doc_id = $1");
        let row = sqlx::query(&sql)
            .bind(key.doc_id())
            .fetch_optional(&self.pool)
            .await
            .context("sheet query failed")?;
        row.as_ref().map(sheet_from_row).transpose()
    }

    async fn sheet_logs(&self, filter: &SheetFilter) -> Result<Vec<SheetLog>> {
        let sql = format!(
            r#"
            select {SHEET_COLUMNS}
              from sheet_logs
             where ($1::text is null or client_id = $1)
               and ($2::text is null or draw = $2)
               and ($3::date is null or sheet_date >= $3)
               and ($4::date is null or sheet_date <= $4)
             order by sheet_date, client_id, draw
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(filter.client_id.as_deref())
            .bind(filter.draw.as_ref().map(DrawCode::as_str))
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.pool)
            .await
            .context("sheet_logs query failed")?;
        rows.iter().map(sheet_from_row).collect()
    }

    async fn clients(&self) -> Result<Vec<Client>> {
        let sql = format!("select {CLIENT_COLUMNS} from clients order by id");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("clients query failed")?;
        rows.iter().map(client_from_row).collect()
    }

    async fn client_by_phone(&self, phone: &str) -> Result<Option<Client>> {
        let sql = format!("select {CLIENT_COLUMNS} from clients where phone = $1");
        let row = sqlx::query(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .context("client_by_phone query failed")?;
        row.as_ref().map(client_from_row).transpose()
    }

    async fn upsert_client(&self, c: &Client) -> Result<()> {
        c.validate()?;
        sqlx::query(
            r#"
            insert into clients (id, name, phone, pair_rate_micros, commission_pct_micros,
                                 opening_balance_micros, payment_type)
            values ($1, $2, $3, $4, $5, $6, $7)
            on conflict (id) do update
               set name = excluded.name,
                   phone = excluded.phone,
                   pair_rate_micros = excluded.pair_rate_micros,
                   commission_pct_micros = excluded.commission_pct_micros,
                   opening_balance_micros = excluded.opening_balance_micros,
                   payment_type = excluded.payment_type
            "#,
        )
        .bind(&c.id)
        .bind(&c.name)
        .bind(c.phone.as_deref())
        .bind(c.pair_rate.raw())
        .bind(c.commission_pct.raw())
        .bind(c.opening_balance.raw())
        .bind(payment_type_str(c.payment_type))
        .execute(&self.pool)
        .await
        .context("upsert_client failed")?;
        Ok(())
    }

    async fn declared_numbers(&self) -> Result<Vec<DeclaredNumber>> {
        let rows = sqlx::query(
            "select draw, declared_date, cell from declared_numbers order by declared_date, draw",
        )
        .fetch_all(&self.pool)
        .await
        .context("declared_numbers query failed")?;
        rows.iter()
            .map(|row| {
                let draw: String = row.try_get("draw")?;
                let cell: String = row.try_get("cell")?;
                let date: NaiveDate = row.try_get("declared_date")?;
                Ok(DeclaredNumber {
                    draw: DrawCode::parse(&draw)?,
                    date,
                    cell: CellKey::parse(&cell)?,
                })
            })
            .collect()
    }

    async fn declare_number(&self, d: &DeclaredNumber) -> Result<()> {
        sqlx::query(
            r#"
            insert into declared_numbers (draw, declared_date, cell)
            values ($1, $2, $3)
            on conflict (draw, declared_date) do update
               set cell = excluded.cell, declared_at = now()
            "#,
        )
        .bind(d.draw.as_str())
        .bind(d.date)
        .bind(d.cell.to_string())
        .execute(&self.pool)
        .await
        .context("declare_number failed")?;
        Ok(())
    }

    async fn settlements(&self) -> Result<Vec<SettlementAdjustment>> {
        let rows = sqlx::query(
            r#"
            select id, settle_date, amount_micros, note, created_at
              from settlements
             order by settle_date, created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("settlements query failed")?;
        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id")?;
                let created_at: DateTime<Utc> = row.try_get("created_at")?;
                Ok(SettlementAdjustment {
                    id,
                    date: row.try_get("settle_date")?,
                    amount: Amount::new(row.try_get("amount_micros")?),
                    note: row.try_get("note")?,
                    created_at,
                })
            })
            .collect()
    }

    async fn record_settlement(&self, a: &SettlementAdjustment) -> Result<()> {
        sqlx::query(
            r#"
            insert into settlements (id, settle_date, amount_micros, note, created_at)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(a.id)
        .bind(a.date)
        .bind(a.amount.raw())
        .bind(&a.note)
        .bind(a.created_at)
        .execute(&self.pool)
        .await
        .context("record_settlement failed")?;
        Ok(())
    }

    async fn clear_client_data(&self, client_id: &str) -> Result<u64> {
        let res = sqlx::query("delete from sheet_logs where client_id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .context("clear_client_data failed")?;
        Ok(res.rows_affected())
    }
}
