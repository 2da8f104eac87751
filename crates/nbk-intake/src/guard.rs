use nbk_grid::Amount;

/// Host-supplied balance predicate.
///
/// `entry_total` is the full proposed increase in stake for one directive.
/// Intake calls this exactly once per directive and applies nothing from the
/// submission if any call returns `false`.
pub trait BalanceGuard {
    fn check_balance(&self, entry_total: Amount) -> bool;
}

/// Accepts everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl BalanceGuard for AllowAll {
    fn check_balance(&self, _entry_total: Amount) -> bool {
        true
    }
}

/// Accepts a directive whose total does not exceed `limit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreditLimit {
    pub limit: Amount,
}

impl BalanceGuard for CreditLimit {
    fn check_balance(&self, entry_total: Amount) -> bool {
        entry_total <= self.limit
    }
}

/// Guard for an optional per-directive credit limit; no limit accepts
/// everything.
pub fn credit_guard(limit: Option<Amount>) -> Box<dyn BalanceGuard + Send + Sync> {
    match limit {
        Some(limit) => Box::new(CreditLimit { limit }),
        None => Box::new(AllowAll),
    }
}

/// Adapter for closures.
pub struct FnGuard<F>(pub F);

impl<F> BalanceGuard for FnGuard<F>
where
    F: Fn(Amount) -> bool,
{
    fn check_balance(&self, entry_total: Amount) -> bool {
        (self.0)(entry_total)
    }
}
