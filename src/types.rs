use crate::error::{SaveError, SaveResult};
use std::fmt;

//==============================================================================
// Cell Values
//==============================================================================

/// A single cell in a table
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Missing value (empty CSV field or blank Excel cell)
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    /// Infer a typed value from a raw delimited-text field
    ///
    /// Examples:
    /// - `""` → Empty
    /// - `"42"` → Number(42.0)
    /// - `"True"` → Bool(true)
    /// - `"abc"` → Text("abc")
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            return CellValue::Empty;
        }
        if raw.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        // Leading/trailing whitespace or a leading '+' means the field was text
        if raw.trim() == raw && !raw.starts_with('+') {
            if let Ok(n) = raw.parse::<f64>() {
                if n.is_finite() {
                    return CellValue::Number(n);
                }
            }
        }
        CellValue::Text(raw.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "Empty",
            CellValue::Number(_) => "Number",
            CellValue::Text(_) => "Text",
            CellValue::Bool(_) => "Boolean",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            // Whole numbers are written without a trailing ".0"
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Bool(true) => f.write_str("True"),
            CellValue::Bool(false) => f.write_str("False"),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

//==============================================================================
// Columns and Tables
//==============================================================================

/// A named column in a table
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An in-memory table: ordered, named columns of equal length
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a header row and row-major data
    pub fn from_rows<S: Into<String>>(
        headers: impl IntoIterator<Item = S>,
        rows: Vec<Vec<CellValue>>,
    ) -> SaveResult<Self> {
        let mut table = Table {
            columns: headers
                .into_iter()
                .map(|name| Column::new(name, Vec::new()))
                .collect(),
        };
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Add a column; its length must match the current row count
    pub fn add_column(&mut self, column: Column) -> SaveResult<()> {
        if !self.columns.is_empty() && column.len() != self.row_count() {
            return Err(SaveError::Shape(format!(
                "Column '{}' has {} rows, expected {} rows",
                column.name,
                column.len(),
                self.row_count()
            )));
        }
        // Replacing keeps the original position
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name == column.name) {
            *existing = column;
        } else {
            self.columns.push(column);
        }
        Ok(())
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> SaveResult<()> {
        if row.len() != self.columns.len() {
            return Err(SaveError::Shape(format!(
                "Row has {} cells, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.values.push(value);
        }
        Ok(())
    }

    /// Get the number of rows (length of first column, all should be same)
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |col| col.len())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get one row as a vector of borrowed cells
    pub fn row(&self, index: usize) -> Option<Vec<&CellValue>> {
        if index >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Validate all columns have the same length
    pub fn validate_lengths(&self) -> SaveResult<()> {
        let row_count = self.row_count();
        for column in &self.columns {
            if column.len() != row_count {
                return Err(SaveError::Shape(format!(
                    "Column '{}' has {} rows, expected {} rows",
                    column.name,
                    column.len(),
                    row_count
                )));
            }
        }
        Ok(())
    }

    /// Keep only the rows for which `predicate` returns true
    pub fn filter_rows<F>(&self, mut predicate: F) -> Table
    where
        F: FnMut(&[&CellValue]) -> bool,
    {
        let keep: Vec<usize> = (0..self.row_count())
            .filter(|&i| {
                let row: Vec<&CellValue> = self.columns.iter().map(|c| &c.values[i]).collect();
                predicate(&row)
            })
            .collect();

        Table {
            columns: self
                .columns
                .iter()
                .map(|c| {
                    Column::new(
                        c.name.clone(),
                        keep.iter().map(|&i| c.values[i].clone()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Project a subset of columns, in the requested order
    pub fn select(&self, names: &[&str]) -> SaveResult<Table> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name)
                    .cloned()
                    .ok_or_else(|| SaveError::Shape(format!("Unknown column '{}'", name)))
            })
            .collect::<SaveResult<Vec<_>>>()?;
        Ok(Table { columns })
    }

    /// Append the rows of `other`; both tables must have the same column names in order
    pub fn append(&self, other: &Table) -> SaveResult<Table> {
        if self.column_names() != other.column_names() {
            return Err(SaveError::Shape(format!(
                "Cannot append columns {:?} to {:?}",
                other.column_names(),
                self.column_names()
            )));
        }
        let mut merged = self.clone();
        for (column, extra) in merged.columns.iter_mut().zip(&other.columns) {
            column.values.extend(extra.values.iter().cloned());
        }
        Ok(merged)
    }
}
