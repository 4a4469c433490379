//! Stamping the valuation date into the DCF Model sheet.

use std::str::FromStr;

use chrono::{Local, NaiveDate};
use dcfm_model::{CellRef, CellValue, ModelResult, Worksheet, ISO_DATE_FORMAT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Label the stamp looks for.
pub const VALUATION_DATE_LABEL: &str = "Valuation Date";
/// Columns between the label and the date it describes.
pub const VALUATION_DATE_OFFSET: i64 = 2;

/// Whether, and with which date, the merged DCF Model is stamped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValuationDate {
    /// Leave the template's value alone.
    #[default]
    Off,
    /// The local date at merge time.
    Today,
    Fixed(NaiveDate),
}

impl ValuationDate {
    /// The date to write, if stamping is on.
    pub fn resolve(self) -> Option<NaiveDate> {
        match self {
            Self::Off => None,
            Self::Today => Some(Local::now().date_naive()),
            Self::Fixed(date) => Some(date),
        }
    }
}

impl FromStr for ValuationDate {
    type Err = String;

    /// `off`, `today`, or a `YYYY-MM-DD` date.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "today" => Ok(Self::Today),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(Self::Fixed)
                .map_err(|e| format!("invalid valuation date {other:?}: {e}")),
        }
    }
}

/// Write `date` two columns right of the first cell (row-major) whose text
/// contains [`VALUATION_DATE_LABEL`]. Returns where it was written, or `None`
/// when no label exists. Only the first label is stamped. A target inside a
/// merged range is redirected to the range's anchor, unless that anchor is
/// the label itself.
///
/// The cell keeps its own formatting when that already shows dates;
/// otherwise it is given the ISO `yyyy-mm-dd` format.
pub fn stamp_valuation_date(sheet: &mut Worksheet, date: NaiveDate) -> ModelResult<Option<CellRef>> {
    let label = sheet
        .cells()
        .find(|(_, cell)| {
            cell.value
                .as_text()
                .is_some_and(|text| text.contains(VALUATION_DATE_LABEL))
        })
        .map(|(at, _)| at);
    let Some(label) = label else {
        return Ok(None);
    };
    let Some(offset) = label.offset(0, VALUATION_DATE_OFFSET) else {
        return Ok(None);
    };
    let target = match sheet.placeholder_range(offset) {
        Some(range) if range.anchor() == label => {
            warn!(sheet = sheet.name(), %range, "valuation date label spans its value cell, not stamping");
            return Ok(None);
        }
        Some(range) => range.anchor(),
        None => offset,
    };

    let cell = sheet.cell_mut(target)?;
    cell.value = CellValue::from(date);
    if let Some(style) = cell.style.as_mut().filter(|s| !s.is_date()) {
        style.number_format = ISO_DATE_FORMAT.to_string();
    }
    debug!(sheet = sheet.name(), cell = %target, %date, "stamped valuation date");
    Ok(Some(target))
}
