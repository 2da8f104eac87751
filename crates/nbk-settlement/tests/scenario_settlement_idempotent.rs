use chrono::NaiveDate;
use nbk_grid::{Amount, CellKey, Grid, Rate};
use nbk_schemas::{Client, DeclaredNumber, DrawCode, PaymentType, SheetLog};
use nbk_settlement::{Period, Scope, SettlementBook, UpperTerms};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

fn client(id: &str, pair: i64, commission: &str) -> Client {
    Client {
        id: id.to_string(),
        name: id.to_string(),
        phone: None,
        pair_rate: Rate::from_units(pair),
        commission_pct: Rate::parse(commission).unwrap(),
        opening_balance: Amount::ZERO,
        payment_type: PaymentType::Cash,
    }
}

fn sheet(client_id: &str, draw: &str, date: NaiveDate, cells: &[(&str, &str)]) -> SheetLog {
    let grid = Grid::from_cells(
        cells
            .iter()
            .map(|(c, a)| (CellKey::parse(c).unwrap(), Amount::parse(a).unwrap())),
    )
    .unwrap();
    SheetLog {
        client_id: client_id.to_string(),
        client_name: client_id.to_string(),
        draw: DrawCode::parse(draw).unwrap(),
        date,
        game_total: grid.total(),
        grid,
        updated_at: None,
    }
}

fn book() -> SettlementBook {
    let mut b = SettlementBook::new(UpperTerms::default());
    b.clients.insert("a".to_string(), client("a", 90, "5"));
    b.clients.insert("b".to_string(), client("b", 85, "2.5"));
    b.logs.push(sheet("a", "GALI", day(1), &[("42", "20"), ("17", "980")]));
    b.logs.push(sheet("b", "GALI", day(1), &[("42", "3.5"), ("00", "10")]));
    b.logs.push(sheet("b", "DSWR", day(1), &[("42", "50")]));
    b.logs.push(sheet("a", "DSWR", day(2), &[("99", "40")]));
    b.declared.insert(DeclaredNumber {
        draw: DrawCode::parse("GALI").unwrap(),
        date: day(1),
        cell: CellKey::parse("42").unwrap(),
    });
    b
}

#[test]
fn scenario_reports_are_idempotent() {
    let b = book();
    let first = b.daily_report(day(1), day(30), &Scope::all()).unwrap();
    let second = b.daily_report(day(1), day(30), &Scope::all()).unwrap();
    assert_eq!(first, second);

    let m1 = b.monthly_report(2024, &Scope::all()).unwrap();
    let m2 = b.monthly_report(2024, &Scope::all()).unwrap();
    assert_eq!(m1, m2);
}

#[test]
fn scenario_declared_number_only_applies_to_its_draw() {
    let b = book();
    // b's DSWR stake on 42 is not passing; only GALI has a declared number.
    let dswr = Scope::client("b").with_draw(DrawCode::parse("DSWR").unwrap());
    let row = b.period_row(Period::day(day(1)), &dswr).unwrap();
    // 50 × 0.975
    assert_eq!(row.client_payable, Amount::parse("48.75").unwrap());
}

#[test]
fn scenario_log_order_does_not_change_figures() {
    let b = book();
    let mut reversed = book();
    reversed.logs.reverse();
    assert_eq!(
        b.period_row(Period::month(2024, 6).unwrap(), &Scope::all()).unwrap(),
        reversed
            .period_row(Period::month(2024, 6).unwrap(), &Scope::all())
            .unwrap()
    );
    assert_eq!(b.cumulative_net(day(30)).unwrap(), reversed.cumulative_net(day(30)).unwrap());
}
