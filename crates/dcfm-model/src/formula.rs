//! Relative-reference translation for formula text.
//!
//! SpreadsheetML stores a shared formula once, on its anchor cell; every
//! other member only names the group. Materializing a member means moving
//! the anchor's relative references by the member's offset, which is what
//! [`shift_references`] does. Absolute parts (`$A`, `$1`) stay put, string
//! literals, quoted sheet names and bracketed structured references are left
//! untouched, and references pushed off the grid become `#REF!`.

use crate::address::{column_index, column_letter, MAX_COLS, MAX_ROWS};

/// Shift relative references in a formula body by `rows` / `cols`.
pub fn shift_references(formula: &str, rows: i64, cols: i64) -> String {
    if rows == 0 && cols == 0 {
        return formula.to_string();
    }
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                let end = quoted_end(&chars, i, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '[' => {
                let end = bracket_end(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            _ if is_word_char(c) => {
                let start = i;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let next = chars.get(i).copied();
                let prev = start.checked_sub(1).map(|p| chars[p]);
                out.push_str(&translate_word(&word, prev, next, &chars, i, rows, cols));
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '$' | '_' | '.')
}

fn quoted_end(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn bracket_end(chars: &[char], start: usize) -> usize {
    let mut depth = 0usize;
    for (offset, c) in chars[start..].iter().enumerate() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return start + offset + 1;
                }
            }
            _ => {}
        }
    }
    chars.len()
}

fn translate_word(
    word: &str,
    prev: Option<char>,
    next: Option<char>,
    chars: &[char],
    end: usize,
    rows: i64,
    cols: i64,
) -> String {
    // Function names and defined names followed by a call are never references.
    if next == Some('(') {
        return word.to_string();
    }
    if let Some((col_abs, col, row_abs, row)) = split_cell(word) {
        return match (
            shift_axis(col, col_abs, cols, MAX_COLS),
            shift_axis(row, row_abs, rows, MAX_ROWS),
        ) {
            (Some(c), Some(r)) => format!(
                "{}{}{}{}",
                if col_abs { "$" } else { "" },
                column_letter(c),
                if row_abs { "$" } else { "" },
                r
            ),
            _ => "#REF!".to_string(),
        };
    }
    // Whole-column (`A:C`) and whole-row (`1:3`) ranges: each side is its own word
    // joined by ':'.
    let colon_adjacent = next == Some(':') || prev == Some(':');
    if colon_adjacent && range_partner_is(chars, end, prev, word) {
        if let Some((abs, col)) = split_axis(word, true) {
            return shift_axis(col, abs, cols, MAX_COLS)
                .map(|c| format!("{}{}", if abs { "$" } else { "" }, column_letter(c)))
                .unwrap_or_else(|| "#REF!".to_string());
        }
        if let Some((abs, row)) = split_axis(word, false) {
            return shift_axis(row, abs, rows, MAX_ROWS)
                .map(|r| format!("{}{}", if abs { "$" } else { "" }, r))
                .unwrap_or_else(|| "#REF!".to_string());
        }
    }
    word.to_string()
}

/// Whether the word on the other side of the ':' has the same shape (both
/// letters-only or both digits-only), so `A:C` and `1:3` qualify but `A1:3` does not.
fn range_partner_is(chars: &[char], end: usize, prev: Option<char>, word: &str) -> bool {
    let letters = split_axis(word, true).is_some();
    let digits = split_axis(word, false).is_some();
    let partner: String = if chars.get(end) == Some(&':') {
        chars[end + 1..].iter().take_while(|c| is_word_char(**c)).collect()
    } else if prev == Some(':') {
        let start = end - word.chars().count();
        let before: Vec<char> = chars[..start - 1]
            .iter()
            .rev()
            .take_while(|c| is_word_char(**c))
            .copied()
            .collect();
        before.into_iter().rev().collect()
    } else {
        return false;
    };
    (letters && split_axis(&partner, true).is_some())
        || (digits && split_axis(&partner, false).is_some())
}

fn split_axis(word: &str, letters: bool) -> Option<(bool, u32)> {
    let (abs, rest) = match word.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, word),
    };
    if rest.is_empty() {
        return None;
    }
    if letters {
        rest.bytes()
            .all(|b| b.is_ascii_alphabetic())
            .then(|| column_index(rest))
            .flatten()
            .map(|c| (abs, c))
    } else {
        rest.bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| rest.parse().ok())
            .flatten()
            .filter(|r| (1..=MAX_ROWS).contains(r))
            .map(|r| (abs, r))
    }
}

fn split_cell(word: &str) -> Option<(bool, u32, bool, u32)> {
    let (col_abs, rest) = match word.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, word),
    };
    let letters_end = rest.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, rest) = rest.split_at(letters_end);
    let col = column_index(letters)?;
    let (row_abs, digits) = match rest.strip_prefix('$') {
        Some(d) => (true, d),
        None => (false, rest),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    (1..=MAX_ROWS).contains(&row).then_some((col_abs, col, row_abs, row))
}

fn shift_axis(value: u32, absolute: bool, delta: i64, max: u32) -> Option<u32> {
    if absolute {
        return Some(value);
    }
    let shifted = i64::from(value) + delta;
    (1..=i64::from(max)).contains(&shifted).then_some(shifted as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifts_relative_parts_only() {
        assert_eq!(shift_references("A1+$B$2+C$3+$D4", 2, 1), "B3+$B$2+D$3+$D6");
        assert_eq!(shift_references("SUM(B2:B10)*2", 1, 0), "SUM(B3:B11)*2");
    }

    #[test]
    fn leaves_literals_and_functions_alone() {
        assert_eq!(shift_references("IF(A1>0,\"A1\",LOG10(A2))", 1, 0), "IF(A2>0,\"A1\",LOG10(A3))");
        assert_eq!(shift_references("'Sheet A1'!B2*1.5E3", 0, 1), "'Sheet A1'!C2*1.5E3");
        assert_eq!(shift_references("Table1[Revenue]", 3, 3), "Table1[Revenue]");
    }

    #[test]
    fn whole_rows_and_columns() {
        assert_eq!(shift_references("SUM(A:A)", 5, 1), "SUM(B:B)");
        assert_eq!(shift_references("SUM(1:2)", 1, 5), "SUM(2:3)");
        assert_eq!(shift_references("SUM($A:B)", 0, 1), "SUM($A:C)");
    }

    #[test]
    fn off_grid_references_become_ref_errors() {
        assert_eq!(shift_references("A1", -1, 0), "#REF!");
        assert_eq!(shift_references("A1", 0, 0), "A1");
    }
}
