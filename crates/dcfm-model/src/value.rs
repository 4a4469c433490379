use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::address::CellRange;

/// Prefix that marks a cell's content as a formula.
pub const FORMULA_MARKER: char = '=';

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Raw content of a cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
    /// An error literal such as `#DIV/0!`.
    Error(String),
    Formula(Formula),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, Self::Formula(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_formula(&self) -> Option<&Formula> {
        match self {
            Self::Formula(f) => Some(f),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(d: NaiveDateTime) -> Self {
        Self::Date(d)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<Formula> for CellValue {
    fn from(f: Formula) -> Self {
        Self::Formula(f)
    }
}

/// Formula source text, always stored with its leading `=`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    text: String,
    /// Target range when this is the anchor of an array (CSE) formula.
    pub array_range: Option<CellRange>,
}

impl Formula {
    /// Build from text with or without the leading marker.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let text = if text.starts_with(FORMULA_MARKER) {
            text
        } else {
            format!("{FORMULA_MARKER}{text}")
        };
        Self { text, array_range: None }
    }

    pub fn array(text: impl Into<String>, range: CellRange) -> Self {
        Self {
            array_range: Some(range),
            ..Self::new(text)
        }
    }

    /// Full text including the marker, e.g. `=SUM(A1:A3)`.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Expression without the marker, as stored in SpreadsheetML `<f>`.
    pub fn body(&self) -> &str {
        &self.text[FORMULA_MARKER.len_utf8()..]
    }
}

fn epoch(date1904: bool) -> NaiveDateTime {
    let (y, m, d) = if date1904 { (1904, 1, 1) } else { (1899, 12, 30) };
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap_or_default()
        .and_time(chrono::NaiveTime::MIN)
}

/// Convert an Excel serial date to a timestamp, honouring the 1900 leap-year
/// bug (serial 60 is the fictitious 1900-02-29 and maps to 1900-02-28).
pub fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let adjusted = if !date1904 && serial < 61.0 {
        if serial < 60.0 { serial + 1.0 } else { serial }
    } else {
        serial
    };
    let millis = (adjusted * MILLIS_PER_DAY).round() as i64;
    epoch(date1904).checked_add_signed(Duration::milliseconds(millis))
}

/// Convert a timestamp to an Excel serial date.
pub fn datetime_to_serial(value: NaiveDateTime, date1904: bool) -> f64 {
    let millis = (value - epoch(date1904)).num_milliseconds() as f64;
    let days = millis / MILLIS_PER_DAY;
    if !date1904 && days < 61.0 {
        days - 1.0
    } else {
        days
    }
}
