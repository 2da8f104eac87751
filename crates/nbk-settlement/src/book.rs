use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use nbk_grid::Amount;
use nbk_schemas::{Client, DeclaredMap, SettlementAdjustment, SheetLog};
use serde::{Deserialize, Serialize};

use crate::{ClientTerms, Period, Scope, SettlementError, UpperTerms};

/// One row of a daily or monthly report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodReportRow {
    pub label: String,
    pub start: NaiveDate,
    pub client_payable: Amount,
    pub upper_payable: Amount,
    /// `client_payable − upper_payable`
    pub broker_net: Amount,
    /// Sum of adjustments dated inside the period. Zero for scoped reports.
    pub settlements: Amount,
}

/// One active day of the cumulative ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeRow {
    pub date: NaiveDate,
    pub broker_net: Amount,
    pub settlements: Amount,
    /// `broker_net + settlements`
    pub day_total: Amount,
    pub running: Amount,
}

/// One active day of a client's statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRow {
    pub date: NaiveDate,
    pub game_total: Amount,
    pub passing: Amount,
    pub payable: Amount,
    /// Opening balance plus every payable up to and including `date`.
    pub balance: Amount,
}

/// Read-only snapshot the reports are computed from.
#[derive(Clone, Debug, Default)]
pub struct SettlementBook {
    pub logs: Vec<SheetLog>,
    pub declared: DeclaredMap,
    pub clients: BTreeMap<String, Client>,
    pub adjustments: Vec<SettlementAdjustment>,
    pub upper: UpperTerms,
}

#[derive(Default)]
struct Tally {
    game_total: Amount,
    passing: Amount,
}

impl Tally {
    fn add(&mut self, game_total: Amount, passing: Amount) -> Result<(), SettlementError> {
        self.game_total = checked_sum(self.game_total, game_total)?;
        self.passing = checked_sum(self.passing, passing)?;
        Ok(())
    }
}

fn checked_sum(a: Amount, b: Amount) -> Result<Amount, SettlementError> {
    a.checked_add(b).ok_or(SettlementError::Overflow)
}

impl SettlementBook {
    pub fn new(upper: UpperTerms) -> Self {
        Self {
            upper,
            ..Self::default()
        }
    }

    /// Stake the log placed on its draw's declared cell, or zero when the
    /// draw has no declared number for that date.
    pub fn passing(&self, log: &SheetLog) -> Amount {
        self.declared
            .get(&log.draw, log.date)
            .map_or(Amount::ZERO, |cell| log.stake_on(cell))
    }

    fn terms_for(&self, client_id: &str) -> Result<ClientTerms, SettlementError> {
        self.clients
            .get(client_id)
            .map(ClientTerms::from)
            .ok_or_else(|| SettlementError::UnknownClient(client_id.to_string()))
    }

    fn settlements_where(
        &self,
        mut pred: impl FnMut(NaiveDate) -> bool,
    ) -> Result<Amount, SettlementError> {
        self.adjustments
            .iter()
            .filter(|a| pred(a.date))
            .try_fold(Amount::ZERO, |acc, a| checked_sum(acc, a.amount))
    }

    /// `(client_payable, upper_payable)` over the given logs.
    fn net_over<'a>(
        &self,
        logs: impl Iterator<Item = &'a SheetLog>,
    ) -> Result<(Amount, Amount), SettlementError> {
        let mut per_client: BTreeMap<&str, Tally> = BTreeMap::new();
        let mut upper = Tally::default();
        for log in logs {
            let passing = self.passing(log);
            per_client
                .entry(log.client_id.as_str())
                .or_default()
                .add(log.game_total, passing)?;
            upper.add(log.game_total, passing)?;
        }

        let mut client_payable = Amount::ZERO;
        for (client_id, t) in &per_client {
            if t.game_total.is_zero() {
                continue;
            }
            let terms = self.terms_for(client_id)?;
            client_payable = checked_sum(client_payable, terms.payable(t.game_total, t.passing)?)?;
        }
        let upper_payable = self
            .upper
            .as_terms()
            .payable(upper.game_total, upper.passing)?;
        Ok((client_payable, upper_payable))
    }

    /// Net figures for one period and scope.
    pub fn period_row(&self, period: Period, scope: &Scope) -> Result<PeriodReportRow, SettlementError> {
        let logs = self
            .logs
            .iter()
            .filter(|l| period.contains(l.date) && scope.matches(l));
        let (client_payable, upper_payable) = self.net_over(logs)?;
        let broker_net = client_payable
            .checked_sub(upper_payable)
            .ok_or(SettlementError::Overflow)?;
        let settlements = if scope.is_all() {
            self.settlements_where(|d| period.contains(d))?
        } else {
            Amount::ZERO
        };
        Ok(PeriodReportRow {
            label: period.label(),
            start: period.start(),
            client_payable,
            upper_payable,
            broker_net,
            settlements,
        })
    }

    /// Dates carrying an in-scope log. Unscoped, adjustment dates count too.
    fn dates_in_scope<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = NaiveDate> + 'a {
        let adjustments = self
            .adjustments
            .iter()
            .filter(move |_| scope.is_all())
            .map(|a| a.date);
        self.logs
            .iter()
            .filter(move |l| scope.matches(l))
            .map(|l| l.date)
            .chain(adjustments)
    }

    /// Distinct active dates in `[from, to]`.
    pub fn active_days(&self, from: NaiveDate, to: NaiveDate, scope: &Scope) -> BTreeSet<NaiveDate> {
        self.dates_in_scope(scope)
            .filter(|d| *d >= from && *d <= to)
            .collect()
    }

    /// One row per active day, ascending.
    pub fn daily_report(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        scope: &Scope,
    ) -> Result<Vec<PeriodReportRow>, SettlementError> {
        if from > to {
            return Err(SettlementError::InvalidRange { from, to });
        }
        self.active_days(from, to, scope)
            .into_iter()
            .map(|d| self.period_row(Period::day(d), scope))
            .collect()
    }

    /// One row per active month of `year`.
    pub fn monthly_report(&self, year: i32, scope: &Scope) -> Result<Vec<PeriodReportRow>, SettlementError> {
        let months: BTreeSet<u32> = self
            .dates_in_scope(scope)
            .filter(|d| d.year() == year)
            .map(|d| d.month())
            .collect();
        months
            .into_iter()
            .map(|m| self.period_row(Period::month(year, m)?, scope))
            .collect()
    }

    /// Days up to `through` carrying a log or an adjustment, ascending.
    pub fn ledger_days(&self, through: NaiveDate) -> BTreeSet<NaiveDate> {
        self.logs
            .iter()
            .map(|l| l.date)
            .chain(self.adjustments.iter().map(|a| a.date))
            .filter(|d| *d <= through)
            .collect()
    }

    /// Net for a single ledger day across all clients, adjustments included.
    pub fn day_total(&self, date: NaiveDate) -> Result<(Amount, Amount), SettlementError> {
        let row = self.period_row(Period::day(date), &Scope::all())?;
        Ok((row.broker_net, row.settlements))
    }

    /// Full recompute of the running balance through `through`.
    ///
    /// `running[0] = day_total[0]`, `running[i] = running[i−1] + day_total[i]`.
    pub fn cumulative_net(&self, through: NaiveDate) -> Result<Vec<CumulativeRow>, SettlementError> {
        let mut running = Amount::ZERO;
        let mut out = Vec::new();
        for date in self.ledger_days(through) {
            let (broker_net, settlements) = self.day_total(date)?;
            let day_total = broker_net
                .checked_add(settlements)
                .ok_or(SettlementError::Overflow)?;
            running = running
                .checked_add(day_total)
                .ok_or(SettlementError::Overflow)?;
            out.push(CumulativeRow {
                date,
                broker_net,
                settlements,
                day_total,
                running,
            });
        }
        Ok(out)
    }

    /// Per-day payable for one client, running from their opening balance.
    pub fn client_statement(
        &self,
        client_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StatementRow>, SettlementError> {
        if from > to {
            return Err(SettlementError::InvalidRange { from, to });
        }
        let client = self
            .clients
            .get(client_id)
            .ok_or_else(|| SettlementError::UnknownClient(client_id.to_string()))?;
        let terms = ClientTerms::from(client);

        let mut by_day: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
        for log in self.logs.iter().filter(|l| l.client_id == client_id && l.date <= to) {
            by_day
                .entry(log.date)
                .or_default()
                .add(log.game_total, self.passing(log))?;
        }

        let mut balance = client.opening_balance;
        let mut out = Vec::new();
        for (date, t) in by_day {
            let payable = terms.payable(t.game_total, t.passing)?;
            balance = balance.checked_add(payable).ok_or(SettlementError::Overflow)?;
            if date >= from {
                out.push(StatementRow {
                    date,
                    game_total: t.game_total,
                    passing: t.passing,
                    payable,
                    balance,
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use nbk_grid::{CellKey, Grid, Rate};
    use nbk_schemas::{DeclaredNumber, DrawCode, PaymentType, SettlementAction};

    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn k(s: &str) -> CellKey {
        CellKey::parse(s).unwrap()
    }

    fn draw() -> DrawCode {
        DrawCode::parse("GALI").unwrap()
    }

    fn client(id: &str) -> Client {
        Client {
            id: id.to_string(),
            name: id.to_uppercase(),
            phone: None,
            pair_rate: Rate::from_units(90),
            commission_pct: Rate::from_units(5),
            opening_balance: Amount::from_units(100),
            payment_type: PaymentType::Cash,
        }
    }

    fn log(client_id: &str, date: NaiveDate, cells: &[(&str, i64)]) -> SheetLog {
        let grid = Grid::from_cells(cells.iter().map(|(c, a)| (k(c), Amount::from_units(*a)))).unwrap();
        SheetLog {
            client_id: client_id.to_string(),
            client_name: client_id.to_uppercase(),
            draw: draw(),
            date,
            game_total: grid.total(),
            grid,
            updated_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
        }
    }

    fn book() -> SettlementBook {
        let mut b = SettlementBook::new(UpperTerms::default());
        b.clients.insert("c1".to_string(), client("c1"));
        // 1000 total, 20 on 42
        b.logs.push(log("c1", d(1), &[("42", 20), ("10", 980)]));
        b.declared.insert(DeclaredNumber {
            draw: draw(),
            date: d(1),
            cell: k("42"),
        });
        b
    }

    #[test]
    fn client_payable_end_to_end() {
        let row = book().period_row(Period::day(d(1)), &Scope::all()).unwrap();
        assert_eq!(row.client_payable, Amount::from_units(-850));
        // upper: 1000 × 0.8 − 20 × 80 = −800
        assert_eq!(row.upper_payable, Amount::from_units(-800));
        assert_eq!(row.broker_net, Amount::from_units(-50));
    }

    #[test]
    fn no_declared_number_means_no_passing() {
        let mut b = book();
        b.logs.push(log("c1", d(2), &[("42", 100)]));
        let row = b.period_row(Period::day(d(2)), &Scope::all()).unwrap();
        assert_eq!(row.client_payable, Amount::from_units(95));
    }

    #[test]
    fn missing_terms_is_an_error() {
        let mut b = book();
        b.logs.push(log("ghost", d(1), &[("11", 5)]));
        let err = b.period_row(Period::day(d(1)), &Scope::all()).unwrap_err();
        assert_eq!(err, SettlementError::UnknownClient("ghost".to_string()));
    }

    #[test]
    fn scope_filters_client() {
        let mut b = book();
        b.clients.insert("c2".to_string(), client("c2"));
        b.logs.push(log("c2", d(1), &[("42", 10)]));
        let c2 = b.period_row(Period::day(d(1)), &Scope::client("c2")).unwrap();
        // 10 × 0.95 − 10 × 90
        assert_eq!(c2.client_payable, Amount::parse("-890.5").unwrap());
    }

    #[test]
    fn daily_report_has_one_row_per_active_day() {
        let mut b = book();
        b.logs.push(log("c1", d(3), &[("01", 10)]));
        let rows = b.daily_report(d(1), d(31), &Scope::all()).unwrap();
        assert_eq!(
            rows.iter().map(|r| r.start).collect::<Vec<_>>(),
            vec![d(1), d(3)]
        );
        assert!(b.daily_report(d(5), d(1), &Scope::all()).is_err());
    }

    #[test]
    fn monthly_report_matches_sum_of_days_when_one_client() {
        let mut b = book();
        b.logs.push(log("c1", d(3), &[("01", 10)]));
        let month = b.monthly_report(2024, &Scope::all()).unwrap();
        assert_eq!(month.len(), 1);
        assert_eq!(month[0].label, "2024-03");
        // No declared number on the 3rd: 9.5 on top of −850.
        assert_eq!(month[0].client_payable, Amount::parse("-840.5").unwrap());
    }

    #[test]
    fn adjustments_only_count_unscoped() {
        let mut b = book();
        b.adjustments
            .push(SettlementAdjustment::record(d(1), SettlementAction::Receive(Amount::from_units(30)), ""));
        let all = b.period_row(Period::day(d(1)), &Scope::all()).unwrap();
        let scoped = b.period_row(Period::day(d(1)), &Scope::client("c1")).unwrap();
        assert_eq!(all.settlements, Amount::from_units(30));
        assert_eq!(scoped.settlements, Amount::ZERO);
    }

    #[test]
    fn oversized_totals_are_overflow_not_panic() {
        let mut b = book();
        let mut huge = log("c1", d(2), &[("01", 1)]);
        huge.game_total = Amount::new(i64::MAX);
        b.logs.push(huge.clone());
        b.logs.push(huge);
        let err = b.period_row(Period::day(d(2)), &Scope::all()).unwrap_err();
        assert_eq!(err, SettlementError::Overflow);
        assert_eq!(b.client_statement("c1", d(1), d(2)).unwrap_err(), SettlementError::Overflow);

        let mut b = book();
        for _ in 0..2 {
            b.adjustments.push(SettlementAdjustment::record(
                d(1),
                SettlementAction::Receive(Amount::new(i64::MAX)),
                "",
            ));
        }
        let err = b.period_row(Period::day(d(1)), &Scope::all()).unwrap_err();
        assert_eq!(err, SettlementError::Overflow);
    }

    #[test]
    fn statement_runs_from_opening_balance() {
        let mut b = book();
        b.logs.push(log("c1", d(2), &[("01", 100)]));
        let rows = b.client_statement("c1", d(2), d(31)).unwrap();
        // Day 1 folds into the carried balance: 100 − 850 = −750, then +95.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].payable, Amount::from_units(95));
        assert_eq!(rows[0].balance, Amount::from_units(-655));
    }
}
