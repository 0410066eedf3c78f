//! Delimited-text (CSV) import/export. No index column is ever written.

use crate::error::SaveResult;
use crate::types::{CellValue, Column, Table};
use std::io::{Read, Write};
use std::path::Path;

/// Read a CSV file; the first record is the header
pub fn read_csv(path: &Path) -> SaveResult<Table> {
    let reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    read_csv_from(reader)
}

pub fn read_csv_from_reader<R: Read>(input: R) -> SaveResult<Table> {
    read_csv_from(csv::ReaderBuilder::new().has_headers(true).from_reader(input))
}

fn read_csv_from<R: Read>(mut reader: csv::Reader<R>) -> SaveResult<Table> {
    let mut columns: Vec<Column> = reader
        .headers()?
        .iter()
        .map(|name| Column::new(name, Vec::new()))
        .collect();

    // Ragged records are rejected by the reader itself
    for record in reader.records() {
        let record = record?;
        for (column, field) in columns.iter_mut().zip(record.iter()) {
            column.values.push(CellValue::infer(field));
        }
    }

    let table = Table { columns };
    table.validate_lengths()?;
    Ok(table)
}

/// Serialize a table as CSV into any writer
pub fn write_csv<W: Write>(table: &Table, output: W) -> SaveResult<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(table.columns.iter().map(|c| c.name.as_str()))?;

    for row in 0..table.row_count() {
        writer.write_record(table.columns.iter().map(|c| c.values[row].to_string()))?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_csv_has_header_and_no_index() {
        let table = Table::from_rows(
            ["a", "b"],
            vec![vec![1.0.into(), "x".into()], vec![2.5.into(), CellValue::Empty]],
        )
        .unwrap();

        let mut out = Vec::new();
        write_csv(&table, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b\n1,x\n2.5,\n");
    }

    #[test]
    fn test_quoted_fields_round_trip() {
        let table = Table::from_rows(
            ["note"],
            vec![vec!["hello, \"world\"".into()], vec!["line\nbreak".into()]],
        )
        .unwrap();

        let mut out = Vec::new();
        write_csv(&table, &mut out).unwrap();
        let back = read_csv_from_reader(out.as_slice()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_ragged_csv_is_rejected() {
        let input = "a,b\n1,2\n3\n";
        assert!(read_csv_from_reader(input.as_bytes()).is_err());
    }

    #[test]
    fn test_header_only_csv() {
        let table = read_csv_from_reader("a,b\n".as_bytes()).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.row_count(), 0);
    }
}
