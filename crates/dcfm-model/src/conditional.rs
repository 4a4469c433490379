//! Conditional formatting blocks.
//!
//! Rule payloads that the model does not interpret (colour scales, data bars,
//! icon sets) are carried as serialized SpreadsheetML so they survive a copy
//! unchanged.

use serde::{Deserialize, Serialize};

use crate::address::CellRange;

/// One `<conditionalFormatting>` block: a target area and its rules.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionalFormat {
    pub ranges: Vec<CellRange>,
    pub rules: Vec<ConditionalRule>,
    pub pivot: bool,
}

impl ConditionalFormat {
    /// Space-separated `sqref` form of the target ranges.
    pub fn sqref(&self) -> String {
        self.ranges
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionalRule {
    /// Rule type: `cellIs`, `expression`, `colorScale`, `containsText`, ...
    pub kind: String,
    pub priority: u32,
    pub operator: Option<String>,
    pub stop_if_true: bool,
    /// `<formula>` bodies in document order.
    pub formulas: Vec<String>,
    /// Format applied when the rule matches.
    pub format: Option<DxfRef>,
    /// Remaining rule attributes (`text`, `rank`, `bottom`, `timePeriod`, ...).
    pub attributes: Vec<(String, String)>,
    /// Serialized `colorScale` / `dataBar` / `iconSet` child, if any.
    pub extension_xml: Option<String>,
}

/// Reference from a rule to a differential format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DxfRef {
    /// The format body, detached from any workbook style table.
    Resolved(DifferentialStyle),
    /// An index the source workbook's style table could not satisfy.
    Unresolved(u32),
}

/// Serialized `<dxf>` element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferentialStyle {
    pub xml: String,
}

impl DifferentialStyle {
    pub fn new(xml: impl Into<String>) -> Self {
        Self { xml: xml.into() }
    }
}
