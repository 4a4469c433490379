//! Worksheet copying and merge orchestration for DCF Merge.
//!
//! A merged workbook holds three sheets, in this order:
//!
//! 1. **DCF Model**, always taken from the template workbook;
//! 2. **Consensus**, taken from the consensus upload (mandatory);
//! 3. **Public Company**, taken from the profile upload or the consensus
//!    upload according to [`PublicCompanyPrecedence`], and omitted when
//!    neither has one.
//!
//! Sheets are reproduced by [`copy_worksheet`]: merged ranges first, then
//! row and column dimensions, then every cell with its value, style,
//! hyperlink and comment, and finally the best-effort attributes (freeze
//! pane and view settings, conditional formatting, data validation, print
//! setup, tab visibility). Formulas are copied as text; cross-sheet
//! references resolve by name in the output. Defined names follow the
//! sheets they refer to ([`carry_defined_names`]).
//!
//! # Key Types
//!
//! - [`MergeOptions`]: precedence and valuation-date stamping
//! - [`CopyReport`]: what one sheet copy carried and skipped
//! - [`StagingArea`]: per-request scratch directory
//! - [`MergeError`]: failures, split into client and service faults

pub mod attributes;
pub mod copier;
pub mod error;
pub mod names;
pub mod orchestrator;
pub mod selection;
pub mod staging;
pub mod valuation;

pub use copier::{copy_worksheet, CopyReport};
pub use error::{AttributeError, CopyError, MergeError, MergeResult};
pub use names::carry_defined_names;
pub use orchestrator::{
    build_output, build_output_from_paths, build_workbook, load_template, merge_files,
    parse_upload, MergeOptions, MergeOutcome,
};
pub use selection::{
    plan_sheets, PublicCompanyPrecedence, SheetOrigin, SheetPlan, CONSENSUS_SHEET,
    DCF_MODEL_SHEET, OUTPUT_ORDER, PUBLIC_COMPANY_SHEET,
};
pub use staging::StagingArea;
pub use valuation::{stamp_valuation_date, ValuationDate, VALUATION_DATE_LABEL};

#[cfg(test)]
mod tests {
    use super::*;
    use dcfm_model::{CellRange, CellRef, ConditionalFormat, ConditionalRule, DxfRef, Worksheet};

    #[test]
    fn report_serializes_skipped_attributes_as_messages() {
        let mut source = Worksheet::new("Consensus");
        source.set_value(CellRef::new(1, 1), 5.0).unwrap();
        source.conditional_formats.push(ConditionalFormat {
            ranges: vec![CellRange::from_a1("A1:A9").unwrap()],
            rules: vec![ConditionalRule {
                kind: "cellIs".into(),
                priority: 1,
                operator: Some("greaterThan".into()),
                formulas: vec!["0".into()],
                format: Some(DxfRef::Unresolved(7)),
                ..ConditionalRule::default()
            }],
            pivot: false,
        });
        let mut dest = Worksheet::new("Consensus");
        let report = copy_worksheet(&source, &mut dest).unwrap();
        assert!(!report.is_complete());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sheet"], "Consensus");
        assert_eq!(json["cells"], 1);
        let skipped = json["skipped"].as_array().unwrap();
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].as_str().unwrap().contains("differential style 7"));
    }

    #[test]
    fn options_deserialize_from_kebab_case() {
        let options: MergeOptions = serde_json::from_str(
            r#"{"precedence":"consensus-first","valuation_date":{"fixed":"2025-03-31"}}"#,
        )
        .unwrap();
        assert_eq!(options.precedence, PublicCompanyPrecedence::ConsensusFirst);
        assert!(matches!(options.valuation_date, ValuationDate::Fixed(_)));
    }
}
