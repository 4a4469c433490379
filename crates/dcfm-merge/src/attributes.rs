//! Best-effort sheet attributes: freeze pane and view settings, conditional
//! formatting, data validation, print setup and tab visibility.
//!
//! Each attribute is carried independently. A failure is returned as an
//! [`AttributeError`] and never stops the remaining attributes from being
//! copied.

use dcfm_model::{ConditionalFormat, DxfRef, Worksheet, MAX_COLS, MAX_ROWS};
use tracing::warn;

use crate::error::AttributeError;

/// Copy every optional attribute of `source` onto `destination`, returning
/// the ones that had to be skipped.
pub fn copy_optional_attributes(source: &Worksheet, destination: &mut Worksheet) -> Vec<AttributeError> {
    let mut skipped = Vec::new();

    match source.freeze_panes {
        Some(at) if at.row == 0 || at.col == 0 || at.row > MAX_ROWS || at.col > MAX_COLS => {
            skipped.push(AttributeError::InvalidFreezePane(format!("R{}C{}", at.row, at.col)));
        }
        frozen => destination.freeze_panes = frozen,
    }

    for cf in &source.conditional_formats {
        match clone_conditional_format(cf) {
            Ok(copy) => destination.conditional_formats.push(copy),
            Err(err) => skipped.push(err),
        }
    }

    destination.view = source.view.clone();
    destination.visibility = source.visibility;

    for dv in &source.data_validations {
        if dv.ranges.is_empty() {
            skipped.push(AttributeError::EmptyValidationRange);
        } else {
            destination.data_validations.push(dv.clone());
        }
    }

    destination.print = source.print.clone();

    for err in &skipped {
        warn!(sheet = source.name(), error = %err, "skipped sheet attribute");
    }
    skipped
}

/// Clone one conditional-format block. The block must stand on its own: every
/// rule's differential style has to have been resolved from the source.
pub fn clone_conditional_format(cf: &ConditionalFormat) -> Result<ConditionalFormat, AttributeError> {
    if cf.ranges.is_empty() {
        return Err(AttributeError::EmptyConditionalRange);
    }
    for rule in &cf.rules {
        if let Some(DxfRef::Unresolved(dxf_id)) = rule.format {
            return Err(AttributeError::UnresolvedDifferentialStyle {
                sqref: cf.sqref(),
                dxf_id,
            });
        }
    }
    Ok(cf.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcfm_model::{
        CellRange, CellRef, Color, ConditionalRule, DataValidation, DifferentialStyle, PageSetup,
        PrintSettings, SheetVisibility,
    };

    fn block(sqref: &str, format: Option<DxfRef>) -> ConditionalFormat {
        ConditionalFormat {
            ranges: CellRange::parse_list(sqref).unwrap(),
            rules: vec![ConditionalRule {
                kind: "cellIs".into(),
                priority: 1,
                operator: Some("greaterThan".into()),
                formulas: vec!["100".into()],
                format,
                ..ConditionalRule::default()
            }],
            pivot: false,
        }
    }

    #[test]
    fn a_bad_block_does_not_stop_the_rest() {
        let mut source = Worksheet::new("Consensus");
        source.freeze_panes = Some(CellRef::new(2, 2));
        source.conditional_formats = vec![
            block("B2:B10", Some(DxfRef::Unresolved(42))),
            block("C2:C10", Some(DxfRef::Resolved(DifferentialStyle::new("<dxf><font><b/></font></dxf>")))),
        ];
        source.print = PrintSettings {
            page_setup: Some(PageSetup { orientation: Some("landscape".into()), ..PageSetup::default() }),
            fit_to_page: true,
            ..PrintSettings::default()
        };

        let mut dest = Worksheet::new("Consensus");
        let skipped = copy_optional_attributes(&source, &mut dest);

        assert_eq!(
            skipped,
            vec![AttributeError::UnresolvedDifferentialStyle { sqref: "B2:B10".into(), dxf_id: 42 }]
        );
        assert_eq!(dest.conditional_formats, vec![source.conditional_formats[1].clone()]);
        assert_eq!(dest.freeze_panes, source.freeze_panes);
        assert_eq!(dest.print, source.print);
    }

    #[test]
    fn view_settings_and_validations_are_carried() {
        let mut source = Worksheet::new("Public Company");
        source.view.show_grid_lines = false;
        source.view.zoom_scale = Some(85);
        source.view.tab_color = Some(Color::Rgb("FF00B050".into()));
        source.visibility = SheetVisibility::Hidden;
        source.data_validations = vec![
            DataValidation::list(CellRange::parse_list("B4:B8").unwrap(), "\"USD,EUR\""),
            DataValidation::default(),
        ];

        let mut dest = Worksheet::new("Public Company");
        let skipped = copy_optional_attributes(&source, &mut dest);

        assert_eq!(skipped, vec![AttributeError::EmptyValidationRange]);
        assert_eq!(dest.view, source.view);
        assert!(!dest.view.show_grid_lines);
        assert_eq!(dest.visibility, SheetVisibility::Hidden);
        assert_eq!(dest.data_validations, vec![source.data_validations[0].clone()]);
    }

    #[test]
    fn off_grid_freeze_pane_is_skipped() {
        let mut source = Worksheet::new("S");
        source.freeze_panes = Some(CellRef::new(0, 3));
        let mut dest = Worksheet::new("S");
        let skipped = copy_optional_attributes(&source, &mut dest);
        assert!(matches!(skipped[..], [AttributeError::InvalidFreezePane(_)]));
        assert!(dest.freeze_panes.is_none());
    }

    #[test]
    fn empty_ranges_are_rejected() {
        let cf = ConditionalFormat::default();
        assert_eq!(clone_conditional_format(&cf), Err(AttributeError::EmptyConditionalRange));
    }
}
