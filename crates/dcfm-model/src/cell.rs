use serde::{Deserialize, Serialize};

use crate::style::Style;
use crate::value::CellValue;

/// A populated grid position.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<Style>,
    pub hyperlink: Option<Hyperlink>,
    pub comment: Option<Comment>,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// True when the cell carries nothing worth storing.
    pub fn is_blank(&self) -> bool {
        self.value.is_empty()
            && self.style.is_none()
            && self.hyperlink.is_none()
            && self.comment.is_none()
    }
}

/// A cell hyperlink: an external `target` (URL, file) and/or an in-workbook
/// `location` such as `'Public Company'!A1`.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hyperlink {
    pub target: Option<String>,
    pub location: Option<String>,
    pub tooltip: Option<String>,
    pub display: Option<String>,
}

impl Hyperlink {
    pub fn external(url: impl Into<String>) -> Self {
        Self {
            target: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn internal(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::default()
        }
    }
}

/// A legacy cell note.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }
}
