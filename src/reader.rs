//! Loading CSV / Excel files into a [`Dataset`] with provenance

use crate::dataset::Dataset;
use crate::delimited::read_csv;
use crate::error::{SaveError, SaveResult};
use crate::excel::ExcelImporter;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read `source` into a dataset that remembers where it came from.
///
/// With `continue_from_saved`, an existing `destination` is loaded instead (and
/// becomes the recorded source), so work resumes from the last save.
pub fn load_dataset(
    source: &Path,
    destination: Option<&Path>,
    continue_from_saved: bool,
) -> SaveResult<Dataset> {
    if !source.exists() && !continue_from_saved {
        return Err(SaveError::SourceNotFound(source.to_path_buf()));
    }

    let mut source: PathBuf = source.to_path_buf();
    if continue_from_saved {
        if let Some(destination) = destination.filter(|d| d.exists()) {
            source = destination.to_path_buf();
        }
    }

    let is_csv = source
        .extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let table = if is_csv {
        read_csv(&source)?
    } else {
        ExcelImporter::new(&source).import()?
    };

    debug!(
        source = %source.display(),
        rows = table.row_count(),
        columns = table.column_count(),
        "Loaded dataset"
    );

    Ok(Dataset::with_provenance(
        table,
        Some(source),
        destination.map(Path::to_path_buf),
    ))
}
