//! Excel (.xlsx) support
//!
//! - Import: workbook → [`Table`](crate::types::Table) (first sheet, header row)
//! - Export: [`Table`](crate::types::Table) → workbook, optionally shaped by a
//!   [`FormatSnapshot`] captured from a reference workbook
//! - Format: column widths and header alignment read straight from the package XML

mod exporter;
mod format;
mod importer;

pub use exporter::ExcelExporter;
pub use format::{transplant_format, CellAlignment, ColumnFormat, FormatSnapshot};
pub use importer::ExcelImporter;

/// Convert a zero-based column index to an Excel column letter
///
/// Examples:
/// - 0 → A
/// - 25 → Z
/// - 26 → AA
pub fn column_index_to_letter(index: usize) -> String {
    let mut result = String::new();
    let mut idx = index;

    loop {
        let remainder = idx % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }

    result
}

/// Number of columns in a worksheet (A..=XFD)
pub const MAX_COLUMNS: usize = 16_384;

/// Convert an Excel column letter to a zero-based index (A → 0, AA → 26).
///
/// Letters past XFD are not a valid column and yield None.
pub fn column_letter_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
        if index > MAX_COLUMNS {
            return None;
        }
    }
    Some(index - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_index_to_letter() {
        assert_eq!(column_index_to_letter(0), "A");
        assert_eq!(column_index_to_letter(1), "B");
        assert_eq!(column_index_to_letter(25), "Z");
        assert_eq!(column_index_to_letter(26), "AA");
        assert_eq!(column_index_to_letter(27), "AB");
        assert_eq!(column_index_to_letter(701), "ZZ");
        assert_eq!(column_index_to_letter(702), "AAA");
    }

    #[test]
    fn test_column_letter_to_index() {
        assert_eq!(column_letter_to_index("A"), Some(0));
        assert_eq!(column_letter_to_index("z"), Some(25));
        assert_eq!(column_letter_to_index("AA"), Some(26));
        assert_eq!(column_letter_to_index("ZZ"), Some(701));
        assert_eq!(column_letter_to_index(""), None);
        assert_eq!(column_letter_to_index("A1"), None);
    }

    #[test]
    fn test_column_letter_past_last_column() {
        assert_eq!(column_letter_to_index("XFD"), Some(MAX_COLUMNS - 1));
        assert_eq!(column_letter_to_index("XFE"), None);
        assert_eq!(column_letter_to_index("ZZZZZZZZZZZZZZZ"), None);
    }
}
