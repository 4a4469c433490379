//! SpreadsheetML (`.xlsx`) codec for the DCF Merge workbook model.
//!
//! Reading maps a package onto [`dcfm_model::Workbook`]: cell values and
//! formulas, resolved styles, merges, row and column dimensions, frozen
//! panes and view settings, conditional formatting, data validation,
//! hyperlinks, comments, print setup, sheet visibility and defined names.
//! Writing produces a fresh, self-consistent package from the model.
//!
//! Parts the model has no place for (charts, images, pivot caches) are
//! ignored on read and never written.
//!
//! # Key Functions
//!
//! - [`read_workbook_from_bytes`] / [`read_workbook_from_path`]
//! - [`write_workbook_to_vec`] / [`write_workbook_to_path`]
//! - [`sheet_names_from_bytes`]: tab names without reading cells

pub mod error;
pub mod numfmt;
pub mod package;
mod read;
mod write;
mod xml;

pub use error::{XlsxError, XlsxResult};
pub use package::{Package, Relationship, MAX_PART_BYTES};
pub use read::{read_workbook_from_bytes, read_workbook_from_path, sheet_names_from_bytes};
pub use write::{write_workbook_to_path, write_workbook_to_vec};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dcfm_model::{
        Border, BorderEdge, CellRange, CellRef, CellValue, Color, ColumnDimension, Comment,
        ConditionalFormat, ConditionalRule, DataValidation, DefinedName, DifferentialStyle, DxfRef,
        Fill, Font, Formula, HeaderFooter, Hyperlink, PageMargins, PageSetup, RowDimension,
        SheetVisibility, Style, Workbook, PRINT_AREA,
    };

    fn at(a1: &str) -> CellRef {
        CellRef::from_a1(a1).unwrap()
    }

    fn header_style() -> Style {
        Style {
            font: Font {
                name: Some("Arial".into()),
                size: Some(10.0),
                bold: true,
                color: Some(Color::Rgb("FFFFFFFF".into())),
                ..Font::default()
            },
            fill: Fill::Pattern {
                pattern: "solid".into(),
                fg: Some(Color::Theme { index: 4, tint: Some(-0.25) }),
                bg: None,
            },
            border: Border {
                bottom: BorderEdge { style: Some("medium".into()), color: Some(Color::Auto) },
                ..Border::default()
            },
            ..Style::default()
        }
    }

    fn sample_workbook() -> Workbook {
        let mut wb = Workbook::empty();
        wb.default_font = Some(Font {
            name: Some("Arial".into()),
            size: Some(10.0),
            ..Font::default()
        });
        let ws = wb.create_sheet("DCF Model").unwrap();
        ws.set_value(at("A1"), "Discounted Cash Flow").unwrap();
        ws.set_style(at("A1"), header_style()).unwrap();
        ws.merge(CellRange::from_a1("A1:E1").unwrap()).unwrap();
        ws.set_value(at("A3"), "Valuation Date").unwrap();
        ws.set_value(at("C3"), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()).unwrap();
        ws.set_value(at("A4"), "WACC").unwrap();
        ws.set_value(at("C4"), 0.085).unwrap();
        ws.set_style(at("C4"), Style::default().with_number_format("0.0%")).unwrap();
        ws.set_value(at("C5"), Formula::new("C4*2")).unwrap();
        ws.set_value(at("C6"), true).unwrap();
        ws.set_value(at("C7"), CellValue::Error("#DIV/0!".into())).unwrap();
        ws.cell_mut(at("A8")).unwrap().hyperlink = Some(Hyperlink::external("https://example.com/filings"));
        ws.cell_mut(at("A9")).unwrap().comment = Some(Comment::new("Analyst", "Check against 10-K"));
        ws.set_row_dimension(1, RowDimension { height: Some(24.0), ..Default::default() });
        ws.set_column_dimension(1, ColumnDimension { width: Some(32.5), ..Default::default() });
        ws.set_column_dimension(3, ColumnDimension { width: Some(14.0), hidden: true, ..Default::default() });
        ws.freeze_panes = Some(at("B2"));
        ws.conditional_formats.push(ConditionalFormat {
            ranges: vec![CellRange::from_a1("C4:C6").unwrap()],
            rules: vec![ConditionalRule {
                kind: "cellIs".into(),
                priority: 1,
                operator: Some("lessThan".into()),
                formulas: vec!["0".into()],
                format: Some(DxfRef::Resolved(DifferentialStyle::new(
                    r#"<dxf><font><color rgb="FF9C0006"/></font></dxf>"#,
                ))),
                ..ConditionalRule::default()
            }],
            pivot: false,
        });
        ws.print.margins = Some(PageMargins { left: 0.25, right: 0.25, ..PageMargins::default() });
        ws.print.page_setup = Some(PageSetup {
            orientation: Some("landscape".into()),
            fit_to_width: Some(1),
            fit_to_height: Some(0),
            ..PageSetup::default()
        });
        ws.print.fit_to_page = true;
        ws.print.header_footer = Some(HeaderFooter {
            odd_footer: Some("&LConfidential&RPage &P".into()),
            ..HeaderFooter::default()
        });
        ws.view.show_grid_lines = false;
        ws.view.zoom_scale = Some(85);
        ws.view.tab_color = Some(Color::Theme { index: 5, tint: None });
        ws.data_validations.push(DataValidation {
            prompt: Some("Pick a scenario".into()),
            show_input_message: true,
            ..DataValidation::list(vec![CellRange::from_a1("C10").unwrap()], "\"Base,Bull,Bear\"")
        });
        let notes = wb.create_sheet("Notes").unwrap();
        notes.set_value(at("B2"), "  padded  ").unwrap();
        notes.visibility = SheetVisibility::Hidden;
        wb.add_defined_name(DefinedName::new("WACC", "'DCF Model'!$C$4")).unwrap();
        wb.add_defined_name(DefinedName::local(PRINT_AREA, "'DCF Model'!$A$1:$E$40", "DCF Model"))
            .unwrap();
        wb
    }

    #[test]
    fn workbook_survives_a_write_read_cycle() {
        let original = sample_workbook();
        let bytes = write_workbook_to_vec(&original).unwrap();
        let back = read_workbook_from_bytes(&bytes).unwrap();

        assert_eq!(back.sheet_names(), vec!["DCF Model", "Notes"]);
        assert_eq!(back.default_font, original.default_font);
        let src = original.sheet("DCF Model").unwrap();
        let dst = back.sheet("DCF Model").unwrap();

        for (at, cell) in src.cells() {
            let copy = dst.cell(at).unwrap_or_else(|| panic!("{at} missing"));
            assert_eq!(copy.value, cell.value, "value at {at}");
            assert_eq!(copy.hyperlink, cell.hyperlink, "hyperlink at {at}");
            assert_eq!(copy.comment, cell.comment, "comment at {at}");
        }
        assert_eq!(dst.cell(at("A1")).unwrap().style, Some(header_style()));
        assert_eq!(dst.cell(at("C4")).unwrap().style.as_ref().unwrap().number_format, "0.0%");
        assert_eq!(
            dst.cell(at("C3")).unwrap().style.as_ref().unwrap().number_format,
            dcfm_model::ISO_DATE_FORMAT
        );
        assert!(dst.cell(at("A3")).unwrap().style.is_none());

        assert_eq!(dst.merged_ranges(), src.merged_ranges());
        assert_eq!(dst.row_dimension(1).unwrap().height, Some(24.0));
        assert_eq!(dst.column_dimension(1), src.column_dimension(1));
        assert_eq!(dst.column_dimension(3), src.column_dimension(3));
        assert_eq!(dst.freeze_panes, src.freeze_panes);
        assert_eq!(dst.conditional_formats, src.conditional_formats);
        assert_eq!(dst.print, src.print);
        assert_eq!(dst.view, src.view);
        assert_eq!(dst.data_validations, src.data_validations);
        let notes = back.sheet("Notes").unwrap();
        assert_eq!(notes.value(at("B2")), Some(&CellValue::Text("  padded  ".into())));
        assert_eq!(notes.visibility, SheetVisibility::Hidden);
        assert_eq!(back.defined_names(), original.defined_names());
    }

    #[test]
    fn template_defined_names_survive() {
        let mut wb = Workbook::empty();
        wb.create_sheet("DCF Model").unwrap().set_value(at("A1"), 0.085).unwrap();
        wb.add_defined_name(DefinedName::new("WACC", "'DCF Model'!$A$1")).unwrap();
        let bytes = write_workbook_to_vec(&wb).unwrap();
        let package = Package::from_bytes(&bytes).unwrap();
        let workbook_xml = package.required_xml_part("xl/workbook.xml").unwrap();
        assert!(workbook_xml.contains(
            r#"<definedNames><definedName name="WACC">'DCF Model'!$A$1</definedName></definedNames>"#
        ));
        let back = read_workbook_from_bytes(&bytes).unwrap();
        assert_eq!(back.defined_name("WACC", None).unwrap().refers_to, "'DCF Model'!$A$1");
    }

    #[test]
    fn sheet_names_without_cells() {
        let bytes = write_workbook_to_vec(&sample_workbook()).unwrap();
        assert_eq!(sheet_names_from_bytes(&bytes).unwrap(), vec!["DCF Model", "Notes"]);
    }

    #[test]
    fn path_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.xlsx");
        write_workbook_to_path(&sample_workbook(), &path).unwrap();
        let back = read_workbook_from_path(&path).unwrap();
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn date1904_workbooks_keep_their_dates() {
        let mut wb = Workbook::empty();
        wb.date1904 = true;
        let date = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        wb.create_sheet("S").unwrap().set_value(at("A1"), date).unwrap();
        let back = read_workbook_from_bytes(&write_workbook_to_vec(&wb).unwrap()).unwrap();
        assert!(back.date1904);
        assert_eq!(
            back.sheet("S").unwrap().value(at("A1")),
            Some(&CellValue::Date(date.and_hms_opt(0, 0, 0).unwrap()))
        );
    }
}
