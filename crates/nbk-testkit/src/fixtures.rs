use std::sync::Mutex;

use chrono::NaiveDate;
use nbk_grid::{Amount, CellKey, Grid, Rate};
use nbk_intake::BalanceGuard;
use nbk_schemas::{Client, DrawCode, PaymentType, SheetLog};

/// `YYYY-MM-DD`; panics on a bad literal.
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|e| panic!("bad date '{s}': {e}"))
}

/// Grid from `(cell, whole units)` pairs; panics on bad input.
pub fn grid(cells: &[(&str, i64)]) -> Grid {
    Grid::from_cells(cells.iter().map(|(c, a)| {
        let cell = CellKey::parse(c).unwrap_or_else(|e| panic!("bad cell '{c}': {e}"));
        (cell, Amount::from_units(*a))
    }))
    .unwrap_or_else(|e| panic!("bad grid: {e}"))
}

/// Cash client with pair rate 90 and 5% commission.
pub fn client(id: &str, phone: Option<&str>) -> Client {
    Client {
        id: id.to_string(),
        name: format!("Client {id}"),
        phone: phone.map(str::to_string),
        pair_rate: Rate::from_units(90),
        commission_pct: Rate::from_units(5),
        opening_balance: Amount::ZERO,
        payment_type: PaymentType::Cash,
    }
}

pub fn sheet(client_id: &str, draw: &str, day: &str, cells: &[(&str, i64)]) -> SheetLog {
    let grid = grid(cells);
    SheetLog {
        client_id: client_id.to_string(),
        client_name: format!("Client {client_id}"),
        draw: DrawCode::parse(draw).unwrap_or_else(|e| panic!("bad draw '{draw}': {e}")),
        date: date(day),
        game_total: grid.total(),
        grid,
        updated_at: None,
    }
}

/// Guard that records every entry total it sees and answers with a fixed
/// verdict.
pub struct FixedGuardLog {
    verdict: bool,
    seen: Mutex<Vec<Amount>>,
}

impl FixedGuardLog {
    pub fn allowing() -> Self {
        Self {
            verdict: true,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn refusing() -> Self {
        Self {
            verdict: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<Amount> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl BalanceGuard for FixedGuardLog {
    fn check_balance(&self, entry_total: Amount) -> bool {
        if let Ok(mut s) = self.seen.lock() {
            s.push(entry_total);
        }
        self.verdict
    }
}
