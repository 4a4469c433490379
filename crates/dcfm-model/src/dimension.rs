use serde::{Deserialize, Serialize};

use crate::style::Style;

/// Per-row layout record. Rows without a record use the sheet default.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct RowDimension {
    /// Height in points; `None` keeps the sheet default height.
    pub height: Option<f64>,
    pub hidden: bool,
    pub outline_level: u8,
    pub collapsed: bool,
    /// Style applied to empty cells of the row.
    pub style: Option<Style>,
}

impl RowDimension {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Per-column layout record.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnDimension {
    /// Width in characters of the default font.
    pub width: Option<f64>,
    pub hidden: bool,
    pub outline_level: u8,
    pub collapsed: bool,
    pub best_fit: bool,
    pub style: Option<Style>,
}

impl ColumnDimension {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Sheet-wide defaults from `<sheetFormatPr>`.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct SheetFormat {
    pub default_row_height: Option<f64>,
    pub default_column_width: Option<f64>,
    pub base_column_width: Option<u32>,
    pub custom_height: bool,
}
