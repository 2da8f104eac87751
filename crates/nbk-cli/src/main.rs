use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nbk_db::{BookStore, PgBook};
use nbk_grid::{Amount, CellKey};
use nbk_intake::auto_format_line;
use nbk_schemas::{DeclaredNumber, DrawCode, SettlementAction, SettlementAdjustment};

mod commands;

use commands::{bet, load_config, parse_date, read_text, report};

#[derive(Parser)]
#[command(name = "nbk")]
#[command(about = "Numbers book operator CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (default: NBK_CONFIG)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> local overlays...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Enter shorthand bets for one client, draw and day
    Bet {
        #[arg(long)]
        client_id: String,

        /// Draw code (e.g. DSWR, GALI)
        #[arg(long)]
        draw: String,

        /// YYYY-MM-DD; defaults to today in the configured timezone
        #[arg(long)]
        date: Option<String>,

        /// Shorthand text, one directive per line
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the shorthand from a file instead
        #[arg(long, conflicts_with = "text")]
        file: Option<String>,

        /// Parse and guard only; no database
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Record the winning cell for a draw and day
    Declare {
        #[arg(long)]
        draw: String,

        #[arg(long)]
        date: String,

        /// Two-digit cell, e.g. 07
        #[arg(long)]
        cell: String,
    },

    /// Record a manual settlement (exactly one of --pay-out / --receive)
    Settle {
        #[arg(long)]
        date: String,

        #[arg(long)]
        pay_out: Option<String>,

        #[arg(long)]
        receive: Option<String>,

        #[arg(long, default_value = "")]
        note: String,
    },

    /// Settlement reports
    Report {
        #[command(subcommand)]
        cmd: ReportCmd,
    },

    /// Group digit runs into pairs, one line at a time
    Format {
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        #[arg(long, conflicts_with = "text")]
        file: Option<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum ReportCmd {
    /// One row per active day in [from, to]
    Daily {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        draw: Option<String>,
    },

    /// One row per active month of a year
    Monthly {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        draw: Option<String>,
    },

    /// Running broker total per ledger day
    Cumulative {
        #[arg(long)]
        through: String,
    },

    /// Per-day payable and running balance for one client
    Statement {
        #[arg(long)]
        client_id: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = nbk_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = nbk_db::status(&pool).await?;
                    println!("db_ok={} has_sheet_logs_table={}", s.ok, s.has_sheet_logs_table);
                }
                DbCmd::Migrate => {
                    nbk_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = nbk_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Bet {
            client_id,
            draw,
            date,
            text,
            file,
            dry_run,
        } => {
            let (_, cfg) = load_config(&cli.config_paths)?;
            let date = date.as_deref().map(parse_date).transpose()?;
            bet::run_bet(
                &cfg,
                bet::BetArgs {
                    client_id,
                    draw,
                    date,
                    text: read_text(text, file)?,
                    dry_run,
                },
            )
            .await?;
        }

        Commands::Declare { draw, date, cell } => {
            let (_, cfg) = load_config(&cli.config_paths)?;
            let declared = DeclaredNumber {
                draw: DrawCode::parse(&draw)?,
                date: parse_date(&date)?,
                cell: CellKey::parse(cell.trim())?,
            };
            if !cfg.is_known_draw(&declared.draw) {
                anyhow::bail!("draw {} is not configured", declared.draw);
            }
            let store = PgBook::new(nbk_db::connect_from_env().await?);
            store.declare_number(&declared).await?;
            println!(
                "declared=true draw={} date={} cell={}",
                declared.draw, declared.date, declared.cell
            );
        }

        Commands::Settle {
            date,
            pay_out,
            receive,
            note,
        } => {
            let pay_out = pay_out.as_deref().map(Amount::parse).transpose()?;
            let receive = receive.as_deref().map(Amount::parse).transpose()?;
            let action = SettlementAction::from_fields(pay_out, receive)?;
            let adjustment = SettlementAdjustment::record(parse_date(&date)?, action, note.trim());
            let store = PgBook::new(nbk_db::connect_from_env().await?);
            store.record_settlement(&adjustment).await?;
            println!(
                "settlement_id={} date={} amount={}",
                adjustment.id, adjustment.date, adjustment.amount
            );
        }

        Commands::Report { cmd } => {
            let (_, cfg) = load_config(&cli.config_paths)?;
            match cmd {
                ReportCmd::Daily {
                    from,
                    to,
                    client_id,
                    draw,
                } => report::daily(&cfg, parse_date(&from)?, parse_date(&to)?, client_id, draw).await?,
                ReportCmd::Monthly {
                    year,
                    client_id,
                    draw,
                } => report::monthly(&cfg, year, client_id, draw).await?,
                ReportCmd::Cumulative { through } => {
                    report::cumulative(&cfg, parse_date(&through)?).await?
                }
                ReportCmd::Statement {
                    client_id,
                    from,
                    to,
                } => {
                    report::statement(&cfg, &client_id, parse_date(&from)?, parse_date(&to)?)
                        .await?
                }
            }
        }

        Commands::Format { text, file } => {
            let raw = read_text(text, file).context("format needs input")?;
            for line in raw.lines() {
                println!("{}", auto_format_line(line));
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays `key=value`.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
