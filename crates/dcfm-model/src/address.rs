//! A1-style cell and range addressing.
//!
//! Rows and columns are **1-based** throughout the model: `A1` is
//! `CellRef { row: 1, col: 1 }`. Ordering of [`CellRef`] is row-major, so a
//! `BTreeMap<CellRef, _>` iterates cells the way a spreadsheet reads them.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ModelError, ModelResult};

/// Largest row index Excel accepts.
pub const MAX_ROWS: u32 = 1_048_576;
/// Largest column index Excel accepts (`XFD`).
pub const MAX_COLS: u32 = 16_384;

/// A single cell position. Serializes as its A1 text.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    /// 1-based row.
    pub row: u32,
    /// 1-based column.
    pub col: u32,
}

impl CellRef {
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse an A1 reference, accepting optional `$` markers (`$B$2`).
    pub fn from_a1(a1: &str) -> ModelResult<Self> {
        let invalid = || ModelError::InvalidReference(a1.to_string());
        let s = a1.trim().replace('$', "");
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let col = column_index(letters).ok_or_else(invalid)?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 || row > MAX_ROWS {
            return Err(invalid());
        }
        Ok(Self { row, col })
    }

    /// Render as A1 notation.
    pub fn to_a1(self) -> String {
        format!("{}{}", column_letter(self.col), self.row)
    }

    /// Offset by signed deltas, returning `None` when leaving the grid.
    pub fn offset(self, rows: i64, cols: i64) -> Option<Self> {
        let row = i64::from(self.row) + rows;
        let col = i64::from(self.col) + cols;
        if (1..=i64::from(MAX_ROWS)).contains(&row) && (1..=i64::from(MAX_COLS)).contains(&col) {
            Some(Self::new(row as u32, col as u32))
        } else {
            None
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

impl FromStr for CellRef {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_a1(s)
    }
}

/// An inclusive rectangular range, always normalized so `start` is top-left.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn new(a: CellRef, b: CellRef) -> Self {
        Self {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Parse `A1:B2` or a single-cell reference `C3`.
    pub fn from_a1(a1: &str) -> ModelResult<Self> {
        match a1.trim().split_once(':') {
            None => {
                let cell = CellRef::from_a1(a1)?;
                Ok(Self::new(cell, cell))
            }
            Some((a, b)) => Ok(Self::new(CellRef::from_a1(a)?, CellRef::from_a1(b)?)),
        }
    }

    /// Parse a space-separated list of ranges (an OOXML `sqref`).
    pub fn parse_list(sqref: &str) -> ModelResult<Vec<Self>> {
        sqref.split_whitespace().map(Self::from_a1).collect()
    }

    /// The top-left cell.
    #[inline]
    pub const fn anchor(&self) -> CellRef {
        self.start
    }

    #[inline]
    pub const fn contains(&self, cell: CellRef) -> bool {
        cell.row >= self.start.row
            && cell.row <= self.end.row
            && cell.col >= self.start.col
            && cell.col <= self.end.col
    }

    pub const fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    #[inline]
    pub const fn is_single_cell(&self) -> bool {
        self.start.row == self.end.row && self.start.col == self.end.col
    }

    /// Every cell of the range in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        (self.start.row..=self.end.row)
            .flat_map(move |row| (self.start.col..=self.end.col).map(move |col| CellRef::new(row, col)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_a1(s)
    }
}

macro_rules! a1_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                Self::from_a1(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

a1_serde!(CellRef);
a1_serde!(CellRange);

/// Column index to letters: `1 -> "A"`, `27 -> "AA"`.
pub fn column_letter(mut col: u32) -> String {
    let mut out = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        out.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Column letters to index, case-insensitive. `None` for empty, non-alphabetic
/// or out-of-grid input.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1);
    }
    (col <= MAX_COLS).then_some(col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_and_render_cells() {
        assert_eq!(CellRef::from_a1("A1").unwrap(), CellRef::new(1, 1));
        assert_eq!(CellRef::from_a1("$AB$12").unwrap(), CellRef::new(12, 28));
        assert_eq!(CellRef::new(3, 703).to_a1(), "AAA3");
        assert!(CellRef::from_a1("A0").is_err());
        assert!(CellRef::from_a1("12").is_err());
        assert!(CellRef::from_a1("A1B").is_err());
        assert!(CellRef::from_a1("XFE1").is_err());
    }

    #[test]
    fn ranges_normalize_and_overlap() {
        let r = CellRange::from_a1("C3:A1").unwrap();
        assert_eq!(r.to_string(), "A1:C3");
        assert_eq!(r.anchor(), CellRef::new(1, 1));
        assert!(r.contains(CellRef::new(2, 2)));
        assert!(r.overlaps(&CellRange::from_a1("C3:D4").unwrap()));
        assert!(!r.overlaps(&CellRange::from_a1("D1:D9").unwrap()));
        assert_eq!(r.cells().count(), 9);
        assert_eq!(CellRange::from_a1("B2").unwrap().to_string(), "B2");
    }

    #[test]
    fn sqref_lists() {
        let ranges = CellRange::parse_list("A1:A4 C1").unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1], CellRange::from_a1("C1").unwrap());
    }

    #[test]
    fn row_major_ordering() {
        let mut cells = vec![CellRef::new(2, 1), CellRef::new(1, 5), CellRef::new(1, 2)];
        cells.sort();
        assert_eq!(cells, vec![CellRef::new(1, 2), CellRef::new(1, 5), CellRef::new(2, 1)]);
    }

    proptest! {
        #[test]
        fn column_letters_invert(col in 1u32..=MAX_COLS) {
            prop_assert_eq!(column_index(&column_letter(col)), Some(col));
        }
    }
}
