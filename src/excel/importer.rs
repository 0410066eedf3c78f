//! Excel importer implementation - workbook → Table

use crate::error::{SaveError, SaveResult};
use crate::types::{CellValue, Column, Table};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::{Path, PathBuf};

/// Reads the first worksheet of a workbook into a [`Table`]
pub struct ExcelImporter {
    path: PathBuf,
}

impl ExcelImporter {
    /// Create a new Excel importer
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Import the first sheet; row 1 is the header
    pub fn import(&self) -> SaveResult<Table> {
        let mut workbook = open_workbook_auto(&self.path)
            .map_err(|e| SaveError::Import(format!("Failed to open Excel file: {}", e)))?;

        let first_sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SaveError::Import("Workbook has no worksheets".to_string()))?;

        let range = workbook.worksheet_range(&first_sheet).map_err(|e| {
            SaveError::Import(format!("Failed to read sheet '{}': {}", first_sheet, e))
        })?;

        self.range_to_table(&range)
    }

    fn range_to_table(&self, range: &Range<Data>) -> SaveResult<Table> {
        if range.is_empty() {
            return Ok(Table::new());
        }

        let (height, width) = range.get_size();

        let mut columns: Vec<Column> = (0..width)
            .map(|col| Column::new(self.header_name(range.get((0, col)), col), Vec::new()))
            .collect();

        for row in 1..height {
            for (col, column) in columns.iter_mut().enumerate() {
                column.values.push(Self::convert_cell(range.get((row, col))));
            }
        }

        let table = Table { columns };
        table.validate_lengths()?;
        Ok(table)
    }

    /// Header text for a column; blank headers get a positional name
    fn header_name(&self, cell: Option<&Data>, col: usize) -> String {
        match cell {
            Some(Data::String(s)) if !s.is_empty() => s.clone(),
            Some(Data::Int(i)) => i.to_string(),
            Some(Data::Float(f)) => CellValue::Number(*f).to_string(),
            Some(Data::Empty) | Some(Data::String(_)) | None => format!("Unnamed: {}", col),
            Some(other) => other.to_string(),
        }
    }

    fn convert_cell(cell: Option<&Data>) -> CellValue {
        match cell {
            None | Some(Data::Empty) => CellValue::Empty,
            Some(Data::Float(f)) => CellValue::Number(*f),
            Some(Data::Int(i)) => CellValue::Number(*i as f64),
            Some(Data::Bool(b)) => CellValue::Bool(*b),
            Some(Data::String(s)) => CellValue::Text(s.clone()),
            Some(other) => CellValue::Text(other.to_string()),
        }
    }
}
