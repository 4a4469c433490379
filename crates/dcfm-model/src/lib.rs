//! In-memory workbook model for DCF Merge.
//!
//! The model is deliberately independent of any file format: `dcfm-xlsx`
//! maps SpreadsheetML packages onto it, and `dcfm-merge` copies worksheets
//! between workbooks through it.
//!
//! # Key Types
//!
//! - [`Workbook`]: ordered, uniquely named worksheets
//! - [`Worksheet`]: sparse cell grid with merges, dimensions and print setup
//! - [`Cell`] / [`CellValue`]: content, including [`Formula`] text
//! - [`Style`]: owned formatting bundle (font, fill, border, number format,
//!   alignment, protection)
//! - [`CellRef`] / [`CellRange`]: 1-based A1 addressing
//! - [`ConditionalFormat`]: conditional formatting blocks and rules
//! - [`DataValidation`]: input rules over cell ranges
//! - [`DefinedName`]: workbook- and sheet-scoped names, including print areas
//! - [`SheetView`] / [`SheetVisibility`]: gridlines, zoom, tab color, hidden state

pub mod address;
pub mod cell;
pub mod conditional;
pub mod dimension;
pub mod error;
pub mod formula;
pub mod names;
pub mod print;
pub mod sheet;
pub mod style;
pub mod validation;
pub mod value;
pub mod view;
pub mod workbook;

pub use address::{column_index, column_letter, CellRange, CellRef, MAX_COLS, MAX_ROWS};
pub use cell::{Cell, Comment, Hyperlink};
pub use conditional::{ConditionalFormat, ConditionalRule, DifferentialStyle, DxfRef};
pub use dimension::{ColumnDimension, RowDimension, SheetFormat};
pub use error::{ModelError, ModelResult};
pub use formula::shift_references;
pub use names::{referenced_sheets, DefinedName, BUILTIN_NAME_PREFIX, PRINT_AREA, PRINT_TITLES};
pub use print::{HeaderFooter, PageMargins, PageSetup, PrintOptions, PrintSettings};
pub use sheet::Worksheet;
pub use style::{
    is_date_format, Alignment, Border, BorderEdge, Color, Fill, Font, Protection, Style,
    GENERAL_FORMAT, ISO_DATE_FORMAT,
};
pub use validation::DataValidation;
pub use value::{datetime_to_serial, serial_to_datetime, CellValue, Formula, FORMULA_MARKER};
pub use view::{SheetView, SheetVisibility};
pub use workbook::{validate_sheet_name, Workbook, DEFAULT_SHEET_NAME};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_serializes_to_json() {
        let mut wb = Workbook::empty();
        let ws = wb.create_sheet("Consensus").unwrap();
        ws.set_value(CellRef::new(1, 1), "Revenue").unwrap();
        ws.set_value(CellRef::new(1, 2), Formula::new("SUM(C1:C4)")).unwrap();
        let json = serde_json::to_string(&wb).unwrap();
        let back: Workbook = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wb);
    }
}
