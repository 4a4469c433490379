use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::names::DefinedName;
use crate::sheet::Worksheet;
use crate::style::Font;

/// Name Excel gives the blank sheet of a new workbook.
pub const DEFAULT_SHEET_NAME: &str = "Sheet";

const MAX_SHEET_NAME_LEN: usize = 31;
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// An ordered collection of uniquely named worksheets.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    /// Serial dates in the source package count from 1904-01-01.
    pub date1904: bool,
    /// Font of the workbook's base style; unstyled cells and column widths
    /// are measured against it.
    pub default_font: Option<Font>,
    defined_names: Vec<DefinedName>,
}

impl Workbook {
    /// A workbook holding one blank sheet, like a freshly created document.
    pub fn new() -> Self {
        Self {
            sheets: vec![Worksheet::new(DEFAULT_SHEET_NAME)],
            ..Self::default()
        }
    }

    /// A workbook with no sheets at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Worksheet::name).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn contains_sheet(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Case-sensitive lookup.
    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.name() == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|s| s.name() == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name() == name)
    }

    /// Append a new empty sheet. An existing sheet with the same name must be
    /// removed first.
    pub fn create_sheet(&mut self, name: &str) -> ModelResult<&mut Worksheet> {
        self.add_sheet(Worksheet::new(name))
    }

    /// Append an already-built sheet, enforcing name rules and uniqueness.
    pub fn add_sheet(&mut self, sheet: Worksheet) -> ModelResult<&mut Worksheet> {
        validate_sheet_name(sheet.name())?;
        if self.contains_sheet(sheet.name()) {
            return Err(ModelError::DuplicateSheetName(sheet.name().to_string()));
        }
        self.sheets.push(sheet);
        let last = self.sheets.len() - 1;
        Ok(&mut self.sheets[last])
    }

    /// Remove a sheet together with the names local to it.
    pub fn remove_sheet(&mut self, name: &str) -> Option<Worksheet> {
        let idx = self.position(name)?;
        self.defined_names
            .retain(|n| n.local_sheet.as_deref() != Some(name));
        Some(self.sheets.remove(idx))
    }

    // -- defined names ------------------------------------------------------

    pub fn defined_names(&self) -> &[DefinedName] {
        &self.defined_names
    }

    /// Look up a name in a scope; `None` scope is the workbook.
    pub fn defined_name(&self, name: &str, local_sheet: Option<&str>) -> Option<&DefinedName> {
        self.defined_names.iter().find(|n| {
            n.name.eq_ignore_ascii_case(name) && n.local_sheet.as_deref() == local_sheet
        })
    }

    /// Add a name. A sheet-local name needs its sheet to exist; a name
    /// already defined in the same scope is rejected.
    pub fn add_defined_name(&mut self, name: DefinedName) -> ModelResult<()> {
        if let Some(sheet) = name.local_sheet.as_deref() {
            if !self.contains_sheet(sheet) {
                return Err(ModelError::SheetNotFound(sheet.to_string()));
            }
        }
        if self.defined_names.iter().any(|n| n.same_key(&name)) {
            return Err(ModelError::DuplicateDefinedName(name.name));
        }
        self.defined_names.push(name);
        Ok(())
    }

    /// Reorder sheets so the named ones come first, in the given order.
    /// Sheets not listed keep their relative order after them.
    pub fn reorder(&mut self, names: &[&str]) -> ModelResult<()> {
        for name in names {
            if !self.contains_sheet(name) {
                return Err(ModelError::SheetNotFound((*name).to_string()));
            }
        }
        self.sheets.sort_by_key(|s| {
            names
                .iter()
                .position(|n| *n == s.name())
                .unwrap_or(names.len())
        });
        Ok(())
    }
}

/// Validate a worksheet name against Excel's rules.
pub fn validate_sheet_name(name: &str) -> ModelResult<()> {
    let invalid = |reason: &str| ModelError::InvalidSheetName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(invalid("longer than 31 characters"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_SHEET_CHARS.contains(c)) {
        return Err(invalid(&format!("contains forbidden character {ch:?}")));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(invalid("must not start or end with an apostrophe"));
    }
    Ok(())
}
