use chrono::NaiveDate;
use nbk_grid::{Amount, BetDirective, CellKey, Grid, GridTotals};
use nbk_schemas::{DrawCode, ExtractedOrders, SheetKey};
use tracing::{debug, info, warn};

use crate::{text, BalanceGuard, CrossForm, HarupForm, IntakeError, LedgerStore};

/// Who and what the operator is currently entering bets for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    pub client_id: String,
    pub client_name: String,
    pub draw: DrawCode,
    pub date: NaiveDate,
}

impl SessionContext {
    pub fn key(&self) -> SheetKey {
        SheetKey::new(self.client_id.clone(), self.draw.clone(), self.date)
    }
}

/// Active entry session: the working grid plus its aggregator.
///
/// Totals are maintained incrementally on every applied delta.
#[derive(Clone, Debug)]
pub struct Session {
    ctx: SessionContext,
    grid: Grid,
    totals: GridTotals,
}

impl Session {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            grid: Grid::new(),
            totals: GridTotals::default(),
        }
    }

    /// Resume from a previously persisted grid (e.g. the stored sheet).
    pub fn with_grid(ctx: SessionContext, grid: Grid) -> Self {
        let totals = GridTotals::compute(&grid);
        Self { ctx, grid, totals }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn key(&self) -> SheetKey {
        self.ctx.key()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn totals(&self) -> &GridTotals {
        &self.totals
    }

    /// Incremental totals equal a full recompute and the grid's cached total
    /// is exact.
    pub fn verify_integrity(&self) -> bool {
        self.grid.verify_total()
            && self.totals == GridTotals::compute(&self.grid)
            && self.totals.grand == self.grid.total()
    }

    /// Apply every directive or none.
    fn apply_all(&mut self, directives: &[BetDirective]) -> Result<(), IntakeError> {
        let mut grid = self.grid.clone();
        let mut totals = self.totals.clone();
        for d in directives {
            for &(cell, amount) in d.deltas() {
                grid.add(cell, amount)?;
                totals.apply_delta(cell, amount);
            }
        }
        self.grid = grid;
        self.totals = totals;
        Ok(())
    }
}

/// One of the four accepted input shapes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderSource {
    Text(String),
    Cross(CrossForm),
    Harup(HarupForm),
    Extracted(ExtractedOrders),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedDirective {
    pub description: String,
    pub total: Amount,
    pub cells: usize,
}

/// Result of a committed submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    pub directives: Vec<AppliedDirective>,
    pub total_delta: Amount,
}

/// Parse `source` into directives without touching any state.
pub fn prepare(
    source: &OrderSource,
    ctx: &SessionContext,
) -> Result<Vec<BetDirective>, IntakeError> {
    let directives = match source {
        OrderSource::Text(text) => text::parse_text(text)?,
        OrderSource::Cross(form) => vec![form.directive()?],
        OrderSource::Harup(form) => vec![form.directive()?],
        OrderSource::Extracted(extracted) => extracted_directive(extracted, ctx)?
            .into_iter()
            .collect(),
    };
    if directives.is_empty() {
        return Err(IntakeError::NoValidData);
    }
    Ok(directives)
}

/// Extracted orders become a single directive. Orders with an unusable cell
/// or amount are dropped with a warning.
fn extracted_directive(
    extracted: &ExtractedOrders,
    ctx: &SessionContext,
) -> Result<Option<BetDirective>, IntakeError> {
    if extracted.draw != ctx.draw {
        return Err(IntakeError::InvalidForm(format!(
            "extracted draw {} does not match session draw {}",
            extracted.draw, ctx.draw
        )));
    }
    let mut deltas = Vec::with_capacity(extracted.orders.len());
    for order in &extracted.orders {
        let cell = match CellKey::parse(order.cell.trim()) {
            Ok(c) => c,
            Err(_) => {
                warn!(cell = %order.cell, "extracted order dropped: invalid cell");
                continue;
            }
        };
        if !order.amount.is_positive() {
            warn!(cell = %cell, amount = %order.amount, "extracted order dropped: non-positive amount");
            continue;
        }
        deltas.push((cell, order.amount));
    }
    if deltas.is_empty() {
        return Ok(None);
    }
    let description = format!("extracted {} orders ({})", deltas.len(), extracted.draw);
    Ok(Some(BetDirective::new(description, deltas)?))
}

/// Ask the guard about every directive, in order, stopping at the first
/// refusal. Nothing is applied here.
pub fn check_directives<G>(
    directives: &[BetDirective],
    guard: &G,
    ctx: &SessionContext,
) -> Result<(), IntakeError>
where
    G: BalanceGuard + ?Sized,
{
    for d in directives {
        if !guard.check_balance(d.total()) {
            info!(
                client_id = %ctx.client_id,
                attempted = %d.total(),
                description = d.description(),
                "balance guard refused submission"
            );
            return Err(IntakeError::BalanceExceeded {
                attempted: d.total(),
                description: d.description().to_string(),
            });
        }
    }
    Ok(())
}

/// Parse, guard, apply and persist one submission.
///
/// The guard sees every directive before anything is applied; one refusal
/// aborts with the session untouched. After the local apply, the store is
/// called once per directive in order. A store failure stops at that
/// directive and leaves the local grid as applied.
pub async fn submit<G, S>(
    session: &mut Session,
    source: OrderSource,
    guard: &G,
    store: &S,
) -> Result<Applied, IntakeError>
where
    G: BalanceGuard + ?Sized,
    S: LedgerStore + ?Sized,
{
    let directives = prepare(&source, &session.ctx)?;
    check_directives(&directives, guard, &session.ctx)?;

    let delta_grids = directives
        .iter()
        .map(BetDirective::to_grid)
        .collect::<Result<Vec<_>, _>>()?;
    session.apply_all(&directives)?;
    debug!(grand = %session.totals.grand, "session grid updated");

    let key = session.key();
    let mut applied = Vec::with_capacity(directives.len());
    let mut total_delta = Amount::ZERO;
    for (idx, (d, delta)) in directives.iter().zip(&delta_grids).enumerate() {
        if let Err(e) = store.merge(&key, &session.ctx.client_name, delta).await {
            warn!(doc_id = %key.doc_id(), directive = idx, error = %e, "ledger merge failed");
            return Err(IntakeError::Persistence {
                directive: idx,
                message: format!("{e:#}"),
            });
        }
        total_delta += d.total();
        applied.push(AppliedDirective {
            description: d.description().to_string(),
            total: d.total(),
            cells: delta.len(),
        });
    }

    info!(
        doc_id = %key.doc_id(),
        directives = applied.len(),
        total = %total_delta,
        "submission committed"
    );
    Ok(Applied {
        directives: applied,
        total_delta,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use nbk_schemas::ExtractedOrder;

    use super::*;
    use crate::{AllowAll, CreditLimit, FnGuard};

    #[derive(Default)]
    struct Recorder {
        merges: Mutex<Vec<Grid>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl LedgerStore for Recorder {
        async fn merge(&self, _key: &SheetKey, _name: &str, delta: &Grid) -> anyhow::Result<()> {
            let mut m = self.merges.lock().unwrap();
            if self.fail_on == Some(m.len()) {
                anyhow::bail!("store offline");
            }
            m.push(delta.clone());
            Ok(())
        }
    }

    fn ctx() -> SessionContext {
        SessionContext {
            client_id: "c1".to_string(),
            client_name: "Ravi".to_string(),
            draw: DrawCode::parse("GALI").unwrap(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    fn text(s: &str) -> OrderSource {
        OrderSource::Text(s.to_string())
    }

    #[tokio::test]
    async fn text_submission_merges_once_per_line() {
        let mut s = Session::new(ctx());
        let store = Recorder::default();
        let applied = submit(&mut s, text("12,21(10)\n34*5"), &AllowAll, &store)
            .await
            .unwrap();
        assert_eq!(applied.directives.len(), 2);
        assert_eq!(applied.total_delta, Amount::from_units(25));
        assert_eq!(store.merges.lock().unwrap().len(), 2);
        assert_eq!(s.grid().total(), Amount::from_units(25));
        assert!(s.verify_integrity());
    }

    #[tokio::test]
    async fn guard_called_once_per_directive() {
        let calls = Mutex::new(Vec::new());
        let guard = FnGuard(|a: Amount| {
            calls.lock().unwrap().push(a);
            true
        });
        let mut s = Session::new(ctx());
        submit(&mut s, text("12(10)\n34,43(5)\n56*1"), &guard, &Recorder::default())
            .await
            .unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                Amount::from_units(10),
                Amount::from_units(10),
                Amount::from_units(1)
            ]
        );
    }

    #[tokio::test]
    async fn refusal_leaves_session_and_store_untouched() {
        let mut s = Session::new(ctx());
        let store = Recorder::default();
        let guard = CreditLimit {
            limit: Amount::from_units(50),
        };
        let err = submit(&mut s, text("12(10)\n34,43,56(20)"), &guard, &store)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INTAKE_BALANCE_EXCEEDED");
        assert!(s.grid().is_empty());
        assert!(store.merges.lock().unwrap().is_empty());
    }

    #[test]
    fn check_directives_stops_at_first_refusal() {
        let calls = Mutex::new(Vec::new());
        let guard = FnGuard(|a: Amount| {
            calls.lock().unwrap().push(a);
            a <= Amount::from_units(20)
        });
        let directives = prepare(&text("12(10)\n34,43,56(20)\n78(1)"), &ctx()).unwrap();
        let err = check_directives(&directives, &guard, &ctx()).unwrap_err();
        assert_eq!(
            err,
            IntakeError::BalanceExceeded {
                attempted: Amount::from_units(60),
                description: directives[1].description().to_string(),
            }
        );
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn structural_error_leaves_session_untouched() {
        let mut s = Session::new(ctx());
        let err = submit(&mut s, text("12(10)\n12=5=10"), &AllowAll, &Recorder::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::StructuralValidation { line: 2, .. }));
        assert!(s.grid().is_empty());
    }

    #[tokio::test]
    async fn nothing_parsed_is_no_valid_data() {
        let mut s = Session::new(ctx());
        let err = submit(&mut s, text("hello\n\n"), &AllowAll, &Recorder::default())
            .await
            .unwrap_err();
        assert_eq!(err, IntakeError::NoValidData);
    }

    #[tokio::test]
    async fn persistence_failure_keeps_local_grid() {
        let mut s = Session::new(ctx());
        let store = Recorder {
            fail_on: Some(1),
            ..Recorder::default()
        };
        let err = submit(&mut s, text("12(10)\n34(10)"), &AllowAll, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::Persistence { directive: 1, .. }));
        assert!(!err.is_pre_mutation());
        assert_eq!(s.grid().total(), Amount::from_units(20));
        assert_eq!(store.merges.lock().unwrap().len(), 1);
    }

    #[test]
    fn extracted_orders_drop_bad_entries() {
        let extracted = ExtractedOrders {
            draw: DrawCode::parse("GALI").unwrap(),
            orders: vec![
                ExtractedOrder {
                    cell: "42".to_string(),
                    amount: Amount::from_units(20),
                },
                ExtractedOrder {
                    cell: "7".to_string(),
                    amount: Amount::from_units(5),
                },
                ExtractedOrder {
                    cell: "13".to_string(),
                    amount: Amount::ZERO,
                },
            ],
        };
        let ds = prepare(&OrderSource::Extracted(extracted), &ctx()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].total(), Amount::from_units(20));
    }

    #[test]
    fn extracted_orders_must_match_session_draw() {
        let extracted = ExtractedOrders {
            draw: DrawCode::parse("DSWR").unwrap(),
            orders: vec![],
        };
        assert!(matches!(
            prepare(&OrderSource::Extracted(extracted), &ctx()),
            Err(IntakeError::InvalidForm(_))
        ));
    }

    #[test]
    fn resumed_session_recomputes_totals() {
        let grid = Grid::from_cells([(CellKey::parse("42").unwrap(), Amount::from_units(7))])
            .unwrap();
        let s = Session::with_grid(ctx(), grid);
        assert_eq!(s.totals().row(4), Amount::from_units(7));
        assert!(s.verify_integrity());
    }
}
