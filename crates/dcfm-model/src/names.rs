use serde::{Deserialize, Serialize};

/// Prefix of the names Excel reserves for itself (`_xlnm.Print_Area`, ...).
pub const BUILTIN_NAME_PREFIX: &str = "_xlnm.";
pub const PRINT_AREA: &str = "_xlnm.Print_Area";
pub const PRINT_TITLES: &str = "_xlnm.Print_Titles";

/// A workbook- or sheet-scoped defined name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedName {
    pub name: String,
    /// Formula text without the leading `=`, e.g. `'DCF Model'!$A$1`.
    pub refers_to: String,
    /// Sheet the name is local to; `None` for workbook scope.
    pub local_sheet: Option<String>,
    pub hidden: bool,
    pub comment: Option<String>,
}

impl DefinedName {
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refers_to: refers_to.into(),
            local_sheet: None,
            hidden: false,
            comment: None,
        }
    }

    pub fn local(name: impl Into<String>, refers_to: impl Into<String>, sheet: impl Into<String>) -> Self {
        Self {
            local_sheet: Some(sheet.into()),
            ..Self::new(name, refers_to)
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.name.starts_with(BUILTIN_NAME_PREFIX)
    }

    /// Same name in the same scope. Names compare case-insensitively.
    pub fn same_key(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.local_sheet == other.local_sheet
    }

    /// Sheets named by the references in [`Self::refers_to`], in order of
    /// appearance. External references keep their `[n]` prefix, so they
    /// never match a sheet of this workbook.
    pub fn referenced_sheets(&self) -> Vec<String> {
        referenced_sheets(&self.refers_to)
    }
}

/// Sheet names qualifying references (`Name!A1`, `'My Sheet'!A1`,
/// `First:Last!A1`) in a formula. String literals are skipped.
pub fn referenced_sheets(formula: &str) -> Vec<String> {
    let mut sheets: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        for part in name.split(':').filter(|p| !p.is_empty() && !p.starts_with('#')) {
            if !sheets.iter().any(|s| s == part) {
                sheets.push(part.to_string());
            }
        }
    };

    let mut chars = formula.chars().peekable();
    let mut token = String::new();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                token.clear();
                while let Some(c) = chars.next() {
                    if c == '"' && chars.next_if_eq(&'"').is_none() {
                        break;
                    }
                }
            }
            '\'' => {
                token.clear();
                let mut quoted = String::new();
                while let Some(c) = chars.next() {
                    if c == '\'' && chars.next_if_eq(&'\'').is_none() {
                        break;
                    }
                    quoted.push(c);
                }
                if chars.next_if_eq(&'!').is_some() {
                    push(&quoted);
                }
            }
            '!' => {
                push(&token);
                token.clear();
            }
            c if c.is_alphanumeric() || matches!(c, '_' | '.' | ':' | '[' | ']' | '#' | '\\') => {
                token.push(c);
            }
            _ => token.clear(),
        }
    }
    sheets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_and_bare_sheet_names() {
        assert_eq!(referenced_sheets("'DCF Model'!$A$1"), vec!["DCF Model"]);
        assert_eq!(
            referenced_sheets("SUM(Consensus!B2:B9)+'Public Company'!C3"),
            vec!["Consensus", "Public Company"]
        );
        assert_eq!(referenced_sheets("'O''Brien'!A1"), vec!["O'Brien"]);
    }

    #[test]
    fn constants_and_literals_name_no_sheet() {
        assert!(referenced_sheets("0.085").is_empty());
        assert!(referenced_sheets("\"Consensus!A1\"").is_empty());
        assert!(referenced_sheets("#REF!").is_empty());
    }

    #[test]
    fn print_titles_and_external_references() {
        assert_eq!(
            referenced_sheets("'DCF Model'!$1:$2,'DCF Model'!$A:$A"),
            vec!["DCF Model"]
        );
        assert_eq!(referenced_sheets("[1]Inputs!A1"), vec!["[1]Inputs"]);
        assert_eq!(referenced_sheets("Jan:Mar!B2"), vec!["Jan", "Mar"]);
    }

    #[test]
    fn keys_ignore_case_but_not_scope() {
        let global = DefinedName::new("WACC", "0.08");
        assert!(global.same_key(&DefinedName::new("wacc", "0.09")));
        assert!(!global.same_key(&DefinedName::local("WACC", "0.08", "DCF Model")));
        assert!(DefinedName::local(PRINT_AREA, "'DCF Model'!$A$1:$H$40", "DCF Model").is_builtin());
    }
}
