//! nbk-db
//!
//! Postgres persistence for the book (sqlx, embedded migrations).
//! - [`PgBook`] implements the ledger merge and the [`BookStore`] reads
//! - grids are stored as `jsonb`, money as micros (`bigint`)
//! - [`load_settlement_book`] builds the settlement snapshot from any store

mod pg;
mod snapshot;
mod store;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub use pg::PgBook;
pub use snapshot::load_settlement_book;
pub use store::{BookStore, SheetFilter};

pub const ENV_DB_URL: &str = "NBK_DATABASE_URL";

/// Connect to Postgres using NBK_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_sheet_logs_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='sheet_logs'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_sheet_logs_table: exists,
    })
}
