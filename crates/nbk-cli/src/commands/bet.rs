//! `nbk bet`: shorthand entry from the terminal.
//!
//! `--dry-run` parses and guards without touching the database.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use nbk_config::BookConfig;
use nbk_db::{BookStore, PgBook};
use nbk_grid::{Amount, Grid};
use nbk_intake::{
    check_directives, credit_guard, prepare, submit, OrderSource, Session, SessionContext,
};
use nbk_schemas::DrawCode;

pub struct BetArgs {
    pub client_id: String,
    pub draw: String,
    pub date: Option<NaiveDate>,
    pub text: String,
    pub dry_run: bool,
}

pub async fn run_bet(cfg: &BookConfig, args: BetArgs) -> Result<()> {
    let draw = DrawCode::parse(&args.draw)?;
    if !cfg.is_known_draw(&draw) {
        anyhow::bail!("draw {draw} is not configured");
    }
    let date = args.date.unwrap_or_else(|| cfg.today());
    let source = OrderSource::Text(args.text);

    if args.dry_run {
        let ctx = SessionContext {
            client_id: args.client_id,
            client_name: String::new(),
            draw,
            date,
        };
        return dry_run(cfg, &source, &ctx);
    }

    let pool = nbk_db::connect_from_env().await?;
    let store = PgBook::new(pool);
    let client = store
        .clients()
        .await?
        .into_iter()
        .find(|c| c.id == args.client_id)
        .with_context(|| format!("unknown client '{}'", args.client_id))?;

    let ctx = SessionContext {
        client_id: client.id,
        client_name: client.name,
        draw,
        date,
    };
    let existing = store
        .sheet(&ctx.key())
        .await?
        .map(|log| log.grid)
        .unwrap_or_else(Grid::new);
    let mut session = Session::with_grid(ctx, existing);
    let guard = credit_guard(cfg.intake.credit_limit);
    let applied = submit(&mut session, source, guard.as_ref(), &store).await?;

    println!("doc_id={}", session.key().doc_id());
    for (i, d) in applied.directives.iter().enumerate() {
        println!(
            "directive[{i}] description=\"{}\" total={} cells={}",
            d.description, d.total, d.cells
        );
    }
    println!("total_delta={}", applied.total_delta);
    println!("game_total={}", session.grid().total());
    Ok(())
}

fn dry_run(cfg: &BookConfig, source: &OrderSource, ctx: &SessionContext) -> Result<()> {
    let directives = prepare(source, ctx)?;
    check_directives(&directives, credit_guard(cfg.intake.credit_limit).as_ref(), ctx)?;
    println!("doc_id={}", ctx.key().doc_id());
    for (i, d) in directives.iter().enumerate() {
        println!(
            "directive[{i}] description=\"{}\" total={} cells={}",
            d.description(),
            d.total(),
            d.cell_count()
        );
    }
    let total: Amount = directives.iter().map(|d| d.total()).sum();
    println!("total_delta={total}");
    println!("dry_run=true");
    Ok(())
}
