use serde::{Deserialize, Serialize};

/// `<pageSetup>` attributes.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct PageSetup {
    pub orientation: Option<String>,
    pub paper_size: Option<u32>,
    pub scale: Option<u32>,
    pub fit_to_width: Option<u32>,
    pub fit_to_height: Option<u32>,
    pub first_page_number: Option<u32>,
    pub use_first_page_number: bool,
    pub page_order: Option<String>,
    pub black_and_white: bool,
    pub draft: bool,
    pub cell_comments: Option<String>,
    pub horizontal_dpi: Option<u32>,
    pub vertical_dpi: Option<u32>,
    pub copies: Option<u32>,
}

/// Page margins in inches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub header: f64,
    pub footer: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            left: 0.7,
            right: 0.7,
            top: 0.75,
            bottom: 0.75,
            header: 0.3,
            footer: 0.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrintOptions {
    pub horizontal_centered: bool,
    pub vertical_centered: bool,
    pub headings: bool,
    pub grid_lines: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeaderFooter {
    pub odd_header: Option<String>,
    pub odd_footer: Option<String>,
    pub even_header: Option<String>,
    pub even_footer: Option<String>,
    pub first_header: Option<String>,
    pub first_footer: Option<String>,
    pub different_odd_even: bool,
    pub different_first: bool,
}

impl HeaderFooter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything the sheet contributes to printing.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct PrintSettings {
    pub page_setup: Option<PageSetup>,
    pub margins: Option<PageMargins>,
    pub options: Option<PrintOptions>,
    pub header_footer: Option<HeaderFooter>,
    /// `sheetPr/pageSetUpPr@fitToPage`.
    pub fit_to_page: bool,
}

impl PrintSettings {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
