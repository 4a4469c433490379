use serde::{Deserialize, Serialize};

use crate::address::CellRange;

/// One `<dataValidation>` rule over a set of ranges.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataValidation {
    pub ranges: Vec<CellRange>,
    /// `list`, `whole`, `decimal`, `date`, `time`, `textLength` or `custom`;
    /// `None` accepts any value.
    pub kind: Option<String>,
    pub operator: Option<String>,
    pub allow_blank: bool,
    /// Set when the in-cell dropdown of a list rule is suppressed.
    pub hide_dropdown: bool,
    pub show_input_message: bool,
    pub show_error_message: bool,
    /// `stop`, `warning` or `information`.
    pub error_style: Option<String>,
    pub error_title: Option<String>,
    pub error: Option<String>,
    pub prompt_title: Option<String>,
    pub prompt: Option<String>,
    pub formula1: Option<String>,
    pub formula2: Option<String>,
}

impl DataValidation {
    pub fn list(ranges: Vec<CellRange>, source: impl Into<String>) -> Self {
        Self {
            ranges,
            kind: Some("list".into()),
            allow_blank: true,
            show_error_message: true,
            formula1: Some(source.into()),
            ..Self::default()
        }
    }
}
