//! Cell formatting.
//!
//! A [`Style`] is an owned value bundle. Nothing in a style is shared by
//! reference, so `clone()` always yields an independent copy: mutating the
//! clone can never affect the original or any other cell.

use serde::{Deserialize, Serialize};

/// Number format code Excel uses when none is set.
pub const GENERAL_FORMAT: &str = "General";
/// ISO date format used when the model writes dates itself.
pub const ISO_DATE_FORMAT: &str = "yyyy-mm-dd";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Color {
    /// `AARRGGBB` hex.
    Rgb(String),
    Theme { index: u32, tint: Option<f64> },
    Indexed(u32),
    Auto,
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Font {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    /// `single`, `double`, `singleAccounting`, ...
    pub underline: Option<String>,
    /// `superscript` / `subscript`.
    pub vert_align: Option<String>,
    pub color: Option<Color>,
    pub family: Option<u32>,
    pub charset: Option<u32>,
    pub scheme: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum Fill {
    #[default]
    None,
    Pattern {
        /// `solid`, `gray125`, `darkGrid`, ...
        pattern: String,
        fg: Option<Color>,
        bg: Option<Color>,
    },
    /// Gradient fills are kept as their serialized `<gradientFill>` element.
    Gradient(String),
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct BorderEdge {
    /// `thin`, `medium`, `dashed`, ... `None` means no line.
    pub style: Option<String>,
    pub color: Option<Color>,
}

impl BorderEdge {
    pub fn is_empty(&self) -> bool {
        self.style.is_none() && self.color.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Border {
    pub left: BorderEdge,
    pub right: BorderEdge,
    pub top: BorderEdge,
    pub bottom: BorderEdge,
    pub diagonal: BorderEdge,
    pub diagonal_up: bool,
    pub diagonal_down: bool,
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Alignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub indent: u32,
    pub text_rotation: u32,
}

impl Alignment {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self { locked: true, hidden: false }
    }
}

impl Protection {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub font: Font,
    pub fill: Fill,
    pub border: Border,
    pub number_format: String,
    pub alignment: Alignment,
    pub protection: Protection,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            font: Font::default(),
            fill: Fill::default(),
            border: Border::default(),
            number_format: GENERAL_FORMAT.to_string(),
            alignment: Alignment::default(),
            protection: Protection::default(),
        }
    }
}

impl Style {
    pub fn with_number_format(mut self, code: impl Into<String>) -> Self {
        self.number_format = code.into();
        self
    }

    pub fn is_date(&self) -> bool {
        is_date_format(&self.number_format)
    }
}

/// Whether a number format code renders its value as a date or time.
///
/// Quoted literals, escaped characters and bracketed sections (colours,
/// conditions, locale tags) are ignored; elapsed-time tokens like `[h]` count
/// as time.
pub fn is_date_format(code: &str) -> bool {
    if code.eq_ignore_ascii_case(GENERAL_FORMAT) {
        return false;
    }
    // Only the first section decides how positive numbers render.
    let mut in_quotes = false;
    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '\\' | '_' | '*' => {
                chars.next();
            }
            ';' => return false,
            '[' => {
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c.to_ascii_lowercase());
                }
                if !inner.is_empty() && inner.chars().all(|c| matches!(c, 'h' | 'm' | 's')) {
                    return true;
                }
            }
            'd' | 'D' | 'm' | 'M' | 'y' | 'Y' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}
