use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::GridError;

/// One of the 100 grid cells, `"00"..="99"`.
///
/// Stored as its numeric index so arithmetic on keys can never lose the
/// zero padding; `Display` always renders two digits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey(u8);

impl CellKey {
    /// Key from a numeric index in `0..=99`.
    pub fn from_index(index: u8) -> Option<Self> {
        (index <= 99).then_some(CellKey(index))
    }

    /// Key from a leading (tens) and trailing (units) digit.
    pub fn from_digits(tens: u8, units: u8) -> Option<Self> {
        if tens > 9 || units > 9 {
            return None;
        }
        Some(CellKey(tens * 10 + units))
    }

    /// Strict two-character parse. `"7"`, `"007"` and `" 07"` are rejected.
    pub fn parse(s: &str) -> Result<Self, GridError> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(GridError::InvalidCellKey(s.to_string()));
        }
        Ok(CellKey((bytes[0] - b'0') * 10 + (bytes[1] - b'0')))
    }

    #[inline]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Leading digit; also the row on the grid.
    #[inline]
    pub fn tens(self) -> u8 {
        self.0 / 10
    }

    /// Trailing digit; also the column on the grid.
    #[inline]
    pub fn units(self) -> u8 {
        self.0 % 10
    }

    /// Both digits equal ("jodda").
    pub fn is_self_pair(self) -> bool {
        self.tens() == self.units()
    }

    /// The key with its digits swapped.
    pub fn reversed(self) -> CellKey {
        CellKey(self.units() * 10 + self.tens())
    }

    /// All 100 keys in ascending order.
    pub fn all() -> impl Iterator<Item = CellKey> {
        (0u8..=99).map(CellKey)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for CellKey {
    type Err = GridError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellKey::parse(s)
    }
}

impl Serialize for CellKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        CellKey::parse(&s).map_err(de::Error::custom)
    }
}
