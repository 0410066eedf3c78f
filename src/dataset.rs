//! Dataset: a table plus where it came from and where it should be saved

use crate::error::SaveResult;
use crate::types::{CellValue, Column, Table};
use std::path::{Path, PathBuf};

/// A [`Table`] carrying provenance metadata.
///
/// `source_file` and `destination_file` are carried forward by every operation
/// that derives a new dataset from this one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    table: Table,
    source_file: Option<PathBuf>,
    destination_file: Option<PathBuf>,
}

impl Dataset {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            source_file: None,
            destination_file: None,
        }
    }

    pub fn with_provenance(
        table: Table,
        source_file: Option<PathBuf>,
        destination_file: Option<PathBuf>,
    ) -> Self {
        Self {
            table,
            source_file,
            destination_file,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    pub fn destination_file(&self) -> Option<&Path> {
        self.destination_file.as_deref()
    }

    pub fn set_source_file(&mut self, path: Option<PathBuf>) {
        self.source_file = path;
    }

    pub fn set_destination_file(&mut self, path: Option<PathBuf>) {
        self.destination_file = path;
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.table.column_count()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.table.column(name)
    }

    /// Derive a new dataset from a transformed table, keeping provenance
    pub fn map_table<F>(&self, f: F) -> SaveResult<Dataset>
    where
        F: FnOnce(&Table) -> SaveResult<Table>,
    {
        Ok(self.derive(f(&self.table)?))
    }

    /// Add (or replace) a column
    pub fn with_column(&self, name: &str, values: Vec<CellValue>) -> SaveResult<Dataset> {
        self.map_table(|table| {
            let mut table = table.clone();
            table.add_column(Column::new(name, values))?;
            Ok(table)
        })
    }

    pub fn filter_rows<F>(&self, predicate: F) -> Dataset
    where
        F: FnMut(&[&CellValue]) -> bool,
    {
        self.derive(self.table.filter_rows(predicate))
    }

    pub fn select(&self, names: &[&str]) -> SaveResult<Dataset> {
        self.map_table(|table| table.select(names))
    }

    /// Append another dataset's rows. Provenance comes from `self`.
    pub fn append(&self, other: &Dataset) -> SaveResult<Dataset> {
        self.map_table(|table| table.append(&other.table))
    }

    fn derive(&self, table: Table) -> Dataset {
        Dataset {
            table,
            source_file: self.source_file.clone(),
            destination_file: self.destination_file.clone(),
        }
    }
}

impl From<Table> for Dataset {
    fn from(table: Table) -> Self {
        Dataset::new(table)
    }
}
