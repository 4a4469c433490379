use serde::{Deserialize, Serialize};

use crate::style::Color;

/// How a sheet tab appears in the workbook's tab bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SheetVisibility {
    #[default]
    Visible,
    /// Hidden, but the user can unhide it.
    Hidden,
    /// Hidden and only reachable programmatically.
    VeryHidden,
}

impl SheetVisibility {
    /// Value of the workbook `<sheet state>` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::VeryHidden => "veryHidden",
        }
    }

    /// Unknown states read as visible.
    pub fn from_state(state: &str) -> Self {
        match state {
            "hidden" => Self::Hidden,
            "veryHidden" => Self::VeryHidden,
            _ => Self::Visible,
        }
    }

    pub fn is_visible(self) -> bool {
        self == Self::Visible
    }
}

/// Display settings of a sheet's window, apart from the frozen pane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetView {
    pub show_grid_lines: bool,
    pub show_row_col_headers: bool,
    pub show_zeros: bool,
    pub right_to_left: bool,
    /// Zoom percentage; `None` is 100.
    pub zoom_scale: Option<u32>,
    pub tab_color: Option<Color>,
}

impl Default for SheetView {
    fn default() -> Self {
        Self {
            show_grid_lines: true,
            show_row_col_headers: true,
            show_zeros: true,
            right_to_left: false,
            zoom_scale: None,
            tab_color: None,
        }
    }
}

impl SheetView {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_states() {
        assert_eq!(SheetVisibility::from_state("veryHidden"), SheetVisibility::VeryHidden);
        assert_eq!(SheetVisibility::from_state("bogus"), SheetVisibility::Visible);
        assert_eq!(SheetVisibility::Hidden.as_str(), "hidden");
        assert!(!SheetVisibility::Hidden.is_visible());
    }

    #[test]
    fn default_view_shows_grid() {
        let view = SheetView::default();
        assert!(view.show_grid_lines && view.is_default());
        let zoomed = SheetView { zoom_scale: Some(85), ..SheetView::default() };
        assert!(!zoomed.is_default());
    }
}
