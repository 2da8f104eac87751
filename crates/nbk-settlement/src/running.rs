use std::collections::BTreeMap;

use chrono::NaiveDate;
use nbk_grid::Amount;

use crate::{SettlementBook, SettlementError};

/// Memoized prefix sums over ledger days.
///
/// Entries before the earliest invalidated date stay valid; anything on or
/// after a change (new sheet, adjustment, declared number) must be dropped
/// with [`RunningBalance::invalidate_from`] before the next query.
///
/// When the snapshot is loaded outside the memo's lock, read
/// [`RunningBalance::generation`] before loading and answer with
/// [`RunningBalance::balance_at_snapshot`]: a snapshot that raced an
/// invalidation is answered without being memoized.
#[derive(Clone, Debug, Default)]
pub struct RunningBalance {
    memo: BTreeMap<NaiveDate, Amount>,
    computed_through: Option<NaiveDate>,
    generation: u64,
}

impl RunningBalance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running total as of the last ledger day `<= date` (zero if none).
    pub fn balance_at(
        &mut self,
        book: &SettlementBook,
        date: NaiveDate,
    ) -> Result<Amount, SettlementError> {
        if self.computed_through.map_or(true, |c| c < date) {
            self.extend(book, date)?;
        }
        Ok(self
            .memo
            .range(..=date)
            .next_back()
            .map_or(Amount::ZERO, |(_, v)| *v))
    }

    /// Bumped by every [`RunningBalance::invalidate_from`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// [`RunningBalance::balance_at`] for a snapshot loaded when the memo was
    /// at `generation`. If an invalidation has happened since, the snapshot
    /// may predate that write: the answer is recomputed from it and the memo
    /// is left alone.
    pub fn balance_at_snapshot(
        &mut self,
        book: &SettlementBook,
        date: NaiveDate,
        generation: u64,
    ) -> Result<Amount, SettlementError> {
        if generation == self.generation {
            return self.balance_at(book, date);
        }
        Ok(book
            .cumulative_net(date)?
            .last()
            .map_or(Amount::ZERO, |r| r.running))
    }

    fn extend(&mut self, book: &SettlementBook, through: NaiveDate) -> Result<(), SettlementError> {
        let (mut running, after) = match self.computed_through {
            Some(c) => (
                self.memo.range(..=c).next_back().map_or(Amount::ZERO, |(_, v)| *v),
                Some(c),
            ),
            None => (Amount::ZERO, None),
        };
        for date in book.ledger_days(through) {
            if after.is_some_and(|c| date <= c) {
                continue;
            }
            let (net, settlements) = book.day_total(date)?;
            running = running
                .checked_add(net)
                .and_then(|r| r.checked_add(settlements))
                .ok_or(SettlementError::Overflow)?;
            self.memo.insert(date, running);
        }
        self.computed_through = Some(through);
        Ok(())
    }

    /// Forget every memoized day on or after `date`.
    pub fn invalidate_from(&mut self, date: NaiveDate) {
        self.generation = self.generation.wrapping_add(1);
        self.memo.retain(|d, _| *d < date);
        self.computed_through = match self.computed_through {
            Some(c) if c >= date => date.pred_opt(),
            other => other,
        };
    }

    pub fn memoized_days(&self) -> usize {
        self.memo.len()
    }
}
