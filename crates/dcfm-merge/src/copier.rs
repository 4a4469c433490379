use dcfm_model::{ModelError, Worksheet};
use serde::Serialize;
use tracing::debug;

use crate::attributes::copy_optional_attributes;
use crate::error::{AttributeError, CopyError};

// ---------------------------------------------------------------------------
// CopyReport
// ---------------------------------------------------------------------------

/// What a worksheet copy carried over, and what it had to leave behind.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CopyReport {
    /// Destination sheet name.
    pub sheet: String,
    pub cells: usize,
    pub merged_ranges: usize,
    pub row_dimensions: usize,
    pub column_dimensions: usize,
    pub conditional_formats: usize,
    pub data_validations: usize,
    /// Best-effort attributes that were skipped.
    #[serde(serialize_with = "serialize_errors")]
    pub skipped: Vec<AttributeError>,
}

impl CopyReport {
    /// True when nothing had to be skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

fn serialize_errors<S: serde::Serializer>(errors: &[AttributeError], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(errors.iter().map(ToString::to_string))
}

// ---------------------------------------------------------------------------
// copy_worksheet
// ---------------------------------------------------------------------------

/// Reproduce `source` in the empty sheet `destination`.
///
/// The order matters: merged ranges are declared before any cell is written,
/// so placeholder positions are never populated; dimensions come next, then
/// every anchor or free cell in row-major order, and finally the best-effort
/// attributes. Formulas are copied as text and cross-sheet references are
/// left untouched.
///
/// On error the destination may be partially populated and should be
/// discarded.
pub fn copy_worksheet(source: &Worksheet, destination: &mut Worksheet) -> Result<CopyReport, CopyError> {
    if !destination.is_empty() {
        return Err(CopyError::DestinationNotEmpty(destination.name().to_string()));
    }
    let mut report = CopyReport {
        sheet: destination.name().to_string(),
        ..CopyReport::default()
    };
    let model_error = |sheet: &str, source: ModelError| CopyError::Model {
        sheet: sheet.to_string(),
        source,
    };

    // 1. merged ranges
    for range in source.merged_ranges() {
        destination
            .merge(*range)
            .map_err(|e| model_error(&report.sheet, e))?;
    }
    report.merged_ranges = destination.merged_ranges().len();

    // 2. dimensions
    for (row, dim) in source.row_dimensions() {
        destination.set_row_dimension(row, dim.clone());
    }
    for (col, dim) in source.column_dimensions() {
        destination.set_column_dimension(col, dim.clone());
    }
    destination.format = source.format.clone();
    report.row_dimensions = destination.row_dimensions().count();
    report.column_dimensions = destination.column_dimensions().count();

    // 3. cells
    for (at, cell) in source.cells() {
        if destination.is_placeholder(at) {
            continue;
        }
        destination
            .put_cell(at, cell.clone())
            .map_err(|e| model_error(&report.sheet, e))?;
        report.cells += 1;
    }

    // 4. optional attributes
    report.skipped = copy_optional_attributes(source, destination);
    report.conditional_formats = destination.conditional_formats.len();
    report.data_validations = destination.data_validations.len();

    debug!(
        from = source.name(),
        to = %report.sheet,
        cells = report.cells,
        merged = report.merged_ranges,
        skipped = report.skipped.len(),
        "copied worksheet"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dcfm_model::{
        Alignment, CellRange, CellRef, CellValue, ColumnDimension, Comment, Fill, Formula,
        Hyperlink, RowDimension, SheetFormat, Style,
    };

    fn at(a1: &str) -> CellRef {
        CellRef::from_a1(a1).unwrap()
    }

    fn consensus_sheet() -> Worksheet {
        let mut ws = Worksheet::new("Consensus");
        ws.set_value(at("A1"), "Consensus Estimates").unwrap();
        ws.merge(CellRange::from_a1("A1:D1").unwrap()).unwrap();
        ws.set_value(at("A2"), "FY2025").unwrap();
        ws.set_value(at("B2"), 1250.5).unwrap();
        ws.set_value(at("C2"), true).unwrap();
        ws.set_value(at("D2"), NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()).unwrap();
        ws.set_value(at("E2"), Formula::new("SUM(B2:B9)/'DCF Model'!C4")).unwrap();
        ws.set_style(
            at("B2"),
            Style {
                alignment: Alignment { horizontal: Some("right".into()), ..Alignment::default() },
                ..Style::default().with_number_format("#,##0.0")
            },
        )
        .unwrap();
        ws.cell_mut(at("A3")).unwrap().hyperlink = Some(Hyperlink::external("https://example.com"));
        ws.cell_mut(at("A4")).unwrap().comment = Some(Comment::new("Analyst", "Street high"));
        ws.set_row_dimension(1, RowDimension { height: Some(28.0), ..Default::default() });
        ws.set_column_dimension(1, ColumnDimension { width: Some(30.0), ..Default::default() });
        ws.format = SheetFormat { default_row_height: Some(12.75), ..SheetFormat::default() };
        ws.freeze_panes = Some(at("B3"));
        ws
    }

    #[test]
    fn copy_reproduces_content_and_layout() {
        let source = consensus_sheet();
        let mut dest = Worksheet::new("Consensus");
        let report = copy_worksheet(&source, &mut dest).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.cells, source.cell_count());
        assert_eq!(report.merged_ranges, 1);
        for (at, cell) in source.cells() {
            assert_eq!(dest.cell(at), Some(cell), "cell {at}");
        }
        assert_eq!(dest.merged_ranges(), source.merged_ranges());
        assert_eq!(dest.row_dimension(1), source.row_dimension(1));
        assert_eq!(dest.column_dimension_by_letter("A"), source.column_dimension_by_letter("A"));
        assert_eq!(dest.format, source.format);
        assert_eq!(dest.freeze_panes, Some(at("B3")));
    }

    #[test]
    fn literals_keep_their_type_and_formulas_stay_text() {
        let source = consensus_sheet();
        let mut dest = Worksheet::new("Consensus");
        copy_worksheet(&source, &mut dest).unwrap();
        assert!(matches!(dest.value(at("D2")), Some(CellValue::Date(_))));
        assert_eq!(dest.value(at("C2")), Some(&CellValue::Bool(true)));
        assert_eq!(
            dest.value(at("E2")).and_then(CellValue::as_formula).map(Formula::text),
            Some("=SUM(B2:B9)/'DCF Model'!C4")
        );
    }

    #[test]
    fn copied_styles_are_independent() {
        let source = consensus_sheet();
        let mut dest = Worksheet::new("Consensus");
        copy_worksheet(&source, &mut dest).unwrap();

        let copied = dest.cell_mut(at("B2")).unwrap().style.as_mut().unwrap();
        copied.font.bold = true;
        copied.fill = Fill::Pattern { pattern: "solid".into(), fg: None, bg: None };

        let original = source.cell(at("B2")).unwrap().style.as_ref().unwrap();
        assert!(!original.font.bold);
        assert_eq!(original.fill, Fill::None);
    }

    #[test]
    fn merged_anchor_alone_holds_the_value() {
        let source = consensus_sheet();
        let mut dest = Worksheet::new("Consensus");
        copy_worksheet(&source, &mut dest).unwrap();
        assert_eq!(dest.value(at("A1")), Some(&CellValue::Text("Consensus Estimates".into())));
        for placeholder in ["B1", "C1", "D1"] {
            assert!(dest.cell(at(placeholder)).is_none());
            assert!(dest.is_placeholder(at(placeholder)));
        }
    }

    #[test]
    fn non_empty_destination_is_rejected() {
        let source = consensus_sheet();
        let mut dest = Worksheet::new("Consensus");
        dest.set_value(at("Z99"), "leftover").unwrap();
        assert_eq!(
            copy_worksheet(&source, &mut dest),
            Err(CopyError::DestinationNotEmpty("Consensus".into()))
        );
    }

    #[test]
    fn empty_source_copies_to_empty_sheet() {
        let source = Worksheet::new("Public Company");
        let mut dest = Worksheet::new("Public Company");
        let report = copy_worksheet(&source, &mut dest).unwrap();
        assert_eq!(report.cells, 0);
        assert!(dest.is_empty());
    }
}
