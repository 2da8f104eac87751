use chrono::{Datelike, NaiveDate};
use nbk_schemas::{DrawCode, SheetLog};
use serde::{Deserialize, Serialize};

use crate::SettlementError;

/// A reporting bucket: one calendar day or one calendar month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Period {
    Day { date: NaiveDate },
    Month { year: i32, month: u32 },
}

impl Period {
    pub fn day(date: NaiveDate) -> Self {
        Period::Day { date }
    }

    pub fn month(year: i32, month: u32) -> Result<Self, SettlementError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(SettlementError::InvalidMonth { year, month });
        }
        Ok(Period::Month { year, month })
    }

    pub fn month_of(date: NaiveDate) -> Self {
        Period::Month {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            Period::Day { date: d } => d == date,
            Period::Month { year, month } => date.year() == year && date.month() == month,
        }
    }

    /// First calendar day of the period.
    pub fn start(&self) -> NaiveDate {
        match *self {
            Period::Day { date } => date,
            Period::Month { year, month } => {
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
            }
        }
    }

    /// `2024-03-01` for days, `2024-03` for months.
    pub fn label(&self) -> String {
        match *self {
            Period::Day { date } => date.format("%Y-%m-%d").to_string(),
            Period::Month { year, month } => format!("{year:04}-{month:02}"),
        }
    }
}

/// Optional client and draw filter applied before aggregation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub client_id: Option<String>,
    pub draw: Option<DrawCode>,
}

impl Scope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn client(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            draw: None,
        }
    }

    pub fn with_draw(mut self, draw: DrawCode) -> Self {
        self.draw = Some(draw);
        self
    }

    /// Unfiltered: adjustments only count toward unscoped figures.
    pub fn is_all(&self) -> bool {
        self.client_id.is_none() && self.draw.is_none()
    }

    pub fn matches(&self, log: &SheetLog) -> bool {
        self.client_id.as_deref().map_or(true, |c| c == log.client_id)
            && self.draw.as_ref().map_or(true, |d| *d == log.draw)
    }
}
