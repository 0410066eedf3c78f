//! Excel exporter implementation

use super::FormatSnapshot;
use crate::error::{SaveError, SaveResult};
use crate::types::{CellValue, Table};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs;
use std::path::Path;

/// Writes a [`Table`] as a single-sheet workbook: header row, no index column
pub struct ExcelExporter<'a> {
    table: &'a Table,
    snapshot: Option<&'a FormatSnapshot>,
}

impl<'a> ExcelExporter<'a> {
    /// Create a new Excel exporter
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            snapshot: None,
        }
    }

    /// Apply a captured format snapshot (sheet title, widths, column alignment)
    pub fn with_snapshot(mut self, snapshot: &'a FormatSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Export the table to an Excel .xlsx file
    pub fn export(&self, output_path: &Path) -> SaveResult<()> {
        fs::write(output_path, self.to_bytes()?)?;
        Ok(())
    }

    /// Serialize the workbook into memory
    pub fn to_bytes(&self) -> SaveResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        if let Some(snapshot) = self.snapshot {
            worksheet.set_name(&snapshot.sheet_title).map_err(|e| {
                SaveError::Export(format!("Failed to set worksheet name: {}", e))
            })?;
        }

        self.write_sheet(worksheet)?;

        workbook
            .save_to_buffer()
            .map_err(|e| SaveError::Export(format!("Failed to save Excel file: {}", e)))
    }

    fn write_sheet(&self, worksheet: &mut Worksheet) -> SaveResult<()> {
        let row_count = self.table.row_count();

        // Position i of the snapshot formats column i of the sheet
        let column_formats: Vec<Option<Format>> = match self.snapshot {
            Some(snapshot) => snapshot
                .columns
                .iter()
                .map(|c| c.alignment.to_format())
                .collect(),
            None => Vec::new(),
        };

        for (col_idx, column) in self.table.columns.iter().enumerate() {
            let col = col_idx as u16;
            let format = column_formats.get(col_idx).and_then(|f| f.as_ref());

            // Header row (row 0)
            let header = CellValue::Text(column.name.clone());
            Self::write_cell(worksheet, 0, col, &header, format)?;

            // Data rows start at row 1
            for (row_idx, value) in column.values.iter().enumerate() {
                Self::write_cell(worksheet, row_idx as u32 + 1, col, value, format)?;
            }
        }

        // Snapshot columns beyond the data still get their alignment over the full range
        for (col_idx, format) in column_formats
            .iter()
            .enumerate()
            .skip(self.table.column_count())
        {
            if let Some(format) = format {
                for row in 0..=row_count {
                    worksheet
                        .write_blank(row as u32, col_idx as u16, format)
                        .map_err(|e| {
                            SaveError::Export(format!("Failed to format blank cell: {}", e))
                        })?;
                }
            }
        }

        if let Some(snapshot) = self.snapshot {
            for (col_idx, column) in snapshot.columns.iter().enumerate() {
                if let Some(width) = column.width {
                    worksheet
                        .set_column_width(col_idx as u16, width)
                        .map_err(|e| {
                            SaveError::Export(format!(
                                "Failed to set column {} width: {}",
                                column.letter, e
                            ))
                        })?;
                }
            }
        }

        Ok(())
    }

    /// Write a single cell, with an optional alignment format
    fn write_cell(
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        value: &CellValue,
        format: Option<&Format>,
    ) -> SaveResult<()> {
        let result = match (value, format) {
            (CellValue::Empty, None) => return Ok(()),
            (CellValue::Empty, Some(f)) => worksheet.write_blank(row, col, f),
            (CellValue::Number(n), None) => worksheet.write_number(row, col, *n),
            (CellValue::Number(n), Some(f)) => worksheet.write_number_with_format(row, col, *n, f),
            (CellValue::Text(s), None) => worksheet.write_string(row, col, s),
            (CellValue::Text(s), Some(f)) => worksheet.write_string_with_format(row, col, s, f),
            (CellValue::Bool(b), None) => worksheet.write_boolean(row, col, *b),
            (CellValue::Bool(b), Some(f)) => {
                worksheet.write_boolean_with_format(row, col, *b, f)
            }
        };
        result
            .map(|_| ())
            .map_err(|e| SaveError::Export(format!("Failed to write {}: {}", value.type_name(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::{CellAlignment, ColumnFormat, ExcelImporter};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_table() -> Table {
        Table::from_rows(
            ["item", "price", "in_stock"],
            vec![
                vec!["widget".into(), 9.5.into(), true.into()],
                vec!["gadget".into(), CellValue::Empty, false.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_export_then_import_preserves_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.xlsx");

        let table = sample_table();
        ExcelExporter::new(&table).export(&path).unwrap();

        let imported = ExcelImporter::new(&path).import().unwrap();
        assert_eq!(imported, table);
    }

    #[test]
    fn test_snapshot_sets_sheet_title_and_formats() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shaped.xlsx");

        let snapshot = FormatSnapshot {
            sheet_title: "Inventory".to_string(),
            columns: vec![
                ColumnFormat {
                    letter: "A".into(),
                    width: Some(24.0),
                    alignment: CellAlignment {
                        horizontal: Some("center".into()),
                        ..Default::default()
                    },
                },
                ColumnFormat {
                    letter: "B".into(),
                    width: None,
                    alignment: CellAlignment::default(),
                },
            ],
        };

        let table = sample_table();
        ExcelExporter::new(&table)
            .with_snapshot(&snapshot)
            .export(&path)
            .unwrap();

        let captured = FormatSnapshot::capture(&path).unwrap();
        assert_eq!(captured.sheet_title, "Inventory");
        assert_eq!(captured.columns.len(), 3);
        assert_eq!(captured.columns[0], snapshot.columns[0]);
        assert_eq!(captured.columns[1].width, None);
        assert!(captured.columns[1].alignment.is_default());
    }

    #[test]
    fn test_extra_snapshot_columns_are_formatted_blank() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wide.xlsx");

        let right = CellAlignment {
            horizontal: Some("right".into()),
            ..Default::default()
        };
        let snapshot = FormatSnapshot {
            sheet_title: "Sheet1".to_string(),
            columns: (0..5)
                .map(|i| ColumnFormat {
                    letter: crate::excel::column_index_to_letter(i),
                    width: None,
                    alignment: right.clone(),
                })
                .collect(),
        };

        let table = sample_table();
        ExcelExporter::new(&table)
            .with_snapshot(&snapshot)
            .export(&path)
            .unwrap();

        let captured = FormatSnapshot::capture(&path).unwrap();
        assert_eq!(captured.columns.len(), 5);
        assert_eq!(captured.column("E").unwrap().alignment, right);
    }
}
