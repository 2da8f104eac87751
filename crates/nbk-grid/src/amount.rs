//! Fixed-point money and rate types.
//!
//! Every stake, total and payable in the book is an [`Amount`]: a signed
//! `i64` at 1e-6 scale. Pair rates and commission percentages are [`Rate`]
//! values on the same scale. Products are taken in `i128` and rounded half
//! away from zero back to micros, so report figures never pass through `f64`.
//!
//! There is no `From<i64>` for either type; construct with `from_units`,
//! `new` (raw micros) or `parse`.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{GridError, MICROS_SCALE};

// ---------------------------------------------------------------------------
// Decimal parsing
// ---------------------------------------------------------------------------

/// Convert a decimal string to integer micros deterministically.
///
/// Accepts an optional sign and at most 6 fractional digits. Rejects empty
/// input, non-digit characters and multiple `.` separators.
pub fn parse_micros(s: &str) -> Result<i64, GridError> {
    let raw = s.trim();
    let invalid = |reason: &'static str| GridError::InvalidDecimal {
        raw: raw.to_string(),
        reason,
    };

    if raw.is_empty() {
        return Err(invalid("empty"));
    }

    let (negative, digits) = if let Some(rest) = raw.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = raw.strip_prefix('+') {
        (false, rest)
    } else {
        (false, raw)
    };

    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid("no digits"));
    }
    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(invalid("not a decimal number"));
    }
    if frac_part.len() > 6 {
        return Err(invalid("more than 6 decimal places"));
    }

    let int_val: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid("out of range"))?
    };
    let frac_val: i64 = if frac_part.is_empty() {
        0
    } else {
        format!("{frac_part:0<6}")
            .parse()
            .map_err(|_| invalid("out of range"))?
    };

    let micros = int_val
        .checked_mul(MICROS_SCALE)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(|| invalid("out of range"))?;

    Ok(if negative { -micros } else { micros })
}

/// `a * b / d` in i128, rounded half away from zero.
fn mul_div_round(a: i128, b: i128, d: i128) -> Option<i64> {
    let num = a.checked_mul(b)?;
    let q = num / d;
    let r = num % d;
    let q = if 2 * r.abs() >= d.abs() {
        q + num.signum() * d.signum()
    } else {
        q
    };
    i64::try_from(q).ok()
}

fn fmt_micros(raw: i64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if raw < 0 { "-" } else { "" };
    let abs = raw.unsigned_abs();
    let units = abs / MICROS_SCALE as u64;
    let frac = abs % MICROS_SCALE as u64;
    if frac == 0 {
        write!(f, "{sign}{units}")
    } else {
        let frac = format!("{frac:06}");
        write!(f, "{sign}{units}.{}", frac.trim_end_matches('0'))
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A monetary amount at 1e-6 scale.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Construct from raw micros.
    #[inline]
    pub const fn new(micros: i64) -> Self {
        Amount(micros)
    }

    /// Construct from whole currency units (`50` -> 50.000000).
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Amount(units * MICROS_SCALE)
    }

    pub fn parse(s: &str) -> Result<Self, GridError> {
        parse_micros(s).map(Amount)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// Multiply by a plain count (number of cells, number of digits).
    pub fn checked_mul_count(self, count: usize) -> Option<Amount> {
        let count = i64::try_from(count).ok()?;
        self.0.checked_mul(count).map(Amount)
    }

    /// Divide by `n` only when the division is exact at micro scale.
    ///
    /// Returns `None` for `n == 0` or a non-zero remainder.
    pub fn checked_div_exact(self, n: i64) -> Option<Amount> {
        if n == 0 || self.0 % n != 0 {
            return None;
        }
        Some(Amount(self.0 / n))
    }

    /// `self × rate` (e.g. stake × pair rate).
    pub fn mul_rate(self, rate: Rate) -> Option<Amount> {
        mul_div_round(self.0 as i128, rate.0 as i128, MICROS_SCALE as i128).map(Amount)
    }

    /// What remains after retaining `commission_pct` percent:
    /// `self × (100 − pct) / 100`.
    pub fn after_commission(self, commission_pct: Rate) -> Option<Amount> {
        let retained = Rate::HUNDRED.0.checked_sub(commission_pct.0)?;
        mul_div_round(
            self.0 as i128,
            retained as i128,
            Rate::HUNDRED.0 as i128,
        )
        .map(Amount)
    }
}

impl Add for Amount {
    type Output = Amount;
    #[inline]
    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;
    #[inline]
    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;
    #[inline]
    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl AddAssign for Amount {
    #[inline]
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Amount {
    #[inline]
    fn sub_assign(&mut self, rhs: Amount) {
        self.0 -= rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.copied().sum()
    }
}

/// Trimmed decimal: `50`, `1.5`, `-850`.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_micros(self.0, f)
    }
}

impl std::str::FromStr for Amount {
    type Err = GridError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Rate
// ---------------------------------------------------------------------------

/// A multiplier or percentage at 1e-6 scale.
///
/// Pair rate `90` means the winning stake pays 90×. Commission rates are
/// expressed in percent (`5` = 5%).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rate(i64);

impl Rate {
    pub const ZERO: Rate = Rate(0);
    pub const HUNDRED: Rate = Rate(100 * MICROS_SCALE);

    #[inline]
    pub const fn new(micros: i64) -> Self {
        Rate(micros)
    }

    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Rate(units * MICROS_SCALE)
    }

    pub fn parse(s: &str) -> Result<Self, GridError> {
        parse_micros(s).map(Rate)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// A commission percent is only meaningful in `0..=100`.
    pub fn is_valid_percent(self) -> bool {
        self.0 >= 0 && self.0 <= Rate::HUNDRED.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_micros(self.0, f)
    }
}

impl std::str::FromStr for Rate {
    type Err = GridError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rate::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Serde: decimal strings out, strings or JSON numbers in
// ---------------------------------------------------------------------------

struct DecimalVisitor;

impl<'de> de::Visitor<'de> for DecimalVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        parse_micros(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        v.checked_mul(MICROS_SCALE)
            .ok_or_else(|| E::custom("decimal out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(MICROS_SCALE))
            .ok_or_else(|| E::custom("decimal out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        // Shortest round-trip rendering, then the exact decimal parser.
        parse_micros(&v.to_string()).map_err(E::custom)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(DecimalVisitor).map(Amount)
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(DecimalVisitor).map(Rate)
    }
}
